#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod assets;
pub mod errors;
pub mod renderer;
pub mod resources;
pub mod scene;

pub use assets::{AsyncTexture, TextureLoader};
pub use errors::{AuraError, Result};
pub use renderer::RenderContext;
pub use renderer::irradiance::{ConvolutionSettings, IrradianceConvolver};
pub use renderer::program::ShaderDescriptor;
pub use resources::primitives::*;
pub use resources::{
    ColorEncoding, Geometry, Image, PbrMaterial, ShaderDefines, Texture, TextureSampler,
};
pub use scene::{Camera, Environment, Model, PointLight, Scene, SceneConfig, Transform};
