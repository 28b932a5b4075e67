use glam::Vec3;

/// Roughness floor applied when feeding the shader, never at storage time.
/// Keeps the GGX denominator away from zero for mirror-smooth surfaces.
pub const MIN_ROUGHNESS: f32 = 0.04;

/// PBR 材质参数 (metallic/roughness 工作流)
///
/// 每个 Model 独占一份；字段都是 0..1 的标量，直接喂给 shader uniform。
#[derive(Debug, Clone, PartialEq)]
pub struct PbrMaterial {
    /// Base color, sRGB-encoded; converted to linear in the fragment stage.
    pub albedo: Vec3,
    pub metallic: f32,
    pub roughness: f32,
    /// Ambient occlusion factor.
    pub ao: f32,
}

impl Default for PbrMaterial {
    fn default() -> Self {
        Self {
            albedo: Vec3::ONE,
            metallic: 0.5,
            roughness: 0.5,
            ao: 1.0,
        }
    }
}

impl PbrMaterial {
    #[must_use]
    pub fn new(albedo: Vec3, metallic: f32, roughness: f32) -> Self {
        Self {
            albedo,
            metallic,
            roughness,
            ao: 1.0,
        }
    }

    /// Roughness as consumed by the shader, clamped to `[MIN_ROUGHNESS, 1]`.
    #[inline]
    #[must_use]
    pub fn clamped_roughness(&self) -> f32 {
        self.roughness.clamp(MIN_ROUGHNESS, 1.0)
    }
}
