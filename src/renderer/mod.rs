//! GPU resource ownership and draw submission
//!
//! [`RenderContext`] is the single mutator of GPU state: geometry/texture
//! upload, program compilation and frame submission all go through it, driven
//! from one update/render cycle — no locking anywhere.

pub mod context;
pub mod irradiance;
pub mod program;
pub mod uniforms;

pub use context::RenderContext;
pub use program::{ProgramId, ShaderDescriptor};
pub use uniforms::{DrawCommand, DrawUniforms, EnvironmentBinding, FrameBundle, FrameUniforms};
