//! Typed uniform blocks
//!
//! The uniform namespace of the shaders is a closed, enumerated set rather
//! than a stringly-keyed bag: every field below corresponds to exactly one
//! field of a WGSL-side struct, resolved to a binding location once per
//! compiled program.
//!
//! Mapping to the shader structs (`pbr.wgsl`):
//!
//! | Rust                              | WGSL                           |
//! |-----------------------------------|--------------------------------|
//! | `FrameUniforms.camera_position`   | `u_frame.camera_position`      |
//! | `FrameUniforms.point_lights[i]`   | `u_frame.point_lights[i]`      |
//! | `DrawUniforms.view_projection`    | `u_draw.view_projection`       |
//! | `DrawUniforms.model`              | `u_draw.model`                 |
//! | `DrawUniforms.albedo` …           | `u_draw.albedo` …              |
//! | `EnvironmentBinding.diffuse`      | `env_diffuse` texture binding  |
//!
//! All blocks are `#[repr(C)]` + `Pod` and mirror WGSL std140-compatible
//! layout by hand (16-byte alignment for vec3, 48-byte mat3x3).

use bytemuck::{Pod, Zeroable};
use glam::{Mat3A, Mat4, Vec3};

use crate::resources::texture::Texture;

/// Upper bound of the light array in the frame uniform buffer.
/// The compiled `POINT_LIGHT_COUNT` define selects how many are read.
pub const MAX_POINT_LIGHTS: usize = 8;

/// One point light as laid out in the frame uniform buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuPointLight {
    pub color: Vec3,
    pub intensity: f32,
    pub position: Vec3,
    pub _pad: f32,
}

impl Default for GpuPointLight {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            intensity: 0.0,
            position: Vec3::ZERO,
            _pad: 0.0,
        }
    }
}

/// 全局 Uniforms (每个 Frame 更新)
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub camera_position: Vec3,
    pub _pad0: f32,
    pub point_lights: [GpuPointLight; MAX_POINT_LIGHTS],
}

impl Default for FrameUniforms {
    fn default() -> Self {
        Self {
            camera_position: Vec3::ZERO,
            _pad0: 0.0,
            point_lights: [GpuPointLight::default(); MAX_POINT_LIGHTS],
        }
    }
}

/// 动态模型 Uniforms (每个对象更新, dynamic offset)
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct DrawUniforms {
    /// Camera `projection * view`, shared across all draws of a pass.
    pub view_projection: Mat4,
    /// Model local-to-world matrix, recombined from TRS each frame.
    pub model: Mat4,
    /// Inverse-transpose of the model matrix upper 3x3.
    pub normal_matrix: Mat3A,
    pub albedo: Vec3,
    pub metallic: f32,
    /// Already clamped to the shading floor when assembled.
    pub roughness: f32,
    pub ao: f32,
    pub _pad: [f32; 2],
}

impl Default for DrawUniforms {
    fn default() -> Self {
        Self {
            view_projection: Mat4::IDENTITY,
            model: Mat4::IDENTITY,
            normal_matrix: Mat3A::IDENTITY,
            albedo: Vec3::ONE,
            metallic: 0.0,
            roughness: 1.0,
            ao: 1.0,
            _pad: [0.0; 2],
        }
    }
}

// ============================================================================
// Frame bundle — output of scene assembly, input to draw submission
// ============================================================================

/// The environment texture slots a frame can bind.
///
/// Only resolved textures appear; an absent slot is bound to the context's
/// placeholder texture, which the shader never samples into the lighting
/// result because the matching `USE_*` define governs the code path.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentBinding {
    pub diffuse: Option<Texture>,
    pub specular: Option<Texture>,
    pub brdf_pre_int: Option<Texture>,
}

impl PartialEq for EnvironmentBinding {
    fn eq(&self, other: &Self) -> bool {
        let id = |t: &Option<Texture>| t.as_ref().map(|t| t.image.id());
        id(&self.diffuse) == id(&other.diffuse)
            && id(&self.specular) == id(&other.specular)
            && id(&self.brdf_pre_int) == id(&other.brdf_pre_int)
    }
}

/// One indexed draw: which geometry, with which per-draw uniforms.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    /// Geometry id, resolved against the context's uploaded buffers.
    pub geometry: u64,
    pub uniforms: DrawUniforms,
}

/// Everything a single render pass needs, assembled fresh each frame.
///
/// Assembly is deterministic: the same scene state and camera produce an
/// identical bundle, and per-draw uniforms never leak between draws because
/// each [`DrawCommand`] is written unconditionally from the scene-level base.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameBundle {
    pub frame: FrameUniforms,
    pub environment: EnvironmentBinding,
    pub draws: Vec<DrawCommand>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn test_alignment() {
        assert_eq!(mem::size_of::<GpuPointLight>(), 32);
        assert_eq!(
            mem::size_of::<FrameUniforms>() % 16,
            0,
            "FrameUniforms not aligned to 16 bytes"
        );
        assert_eq!(
            mem::size_of::<DrawUniforms>() % 16,
            0,
            "DrawUniforms not aligned to 16 bytes"
        );
    }
}
