//! CPU-side resource data
//!
//! Everything in this module is plain data: pixel buffers, vertex buffers,
//! material scalars, shader macro sets. GPU residency is owned by
//! [`crate::renderer::RenderContext`]; these types only describe what should
//! be uploaded.

pub mod encoding;
pub mod geometry;
pub mod image;
pub mod material;
pub mod primitives;
pub mod shader_defines;
pub mod texture;

pub use encoding::{MIP_LEVELS, RGBM_MAX_RANGE};
pub use geometry::Geometry;
pub use image::Image;
pub use material::PbrMaterial;
pub use shader_defines::ShaderDefines;
pub use texture::{ColorEncoding, Texture, TextureSampler};
