use glam::Vec3;

/// 点光源
///
/// Intensity is radiant power; the shader applies `1 / (4π r²)` falloff.
/// Immutable after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    /// World-space position.
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

impl PointLight {
    #[must_use]
    pub fn new(position: Vec3, intensity: f32) -> Self {
        Self {
            position,
            color: Vec3::ONE,
            intensity,
        }
    }

    #[must_use]
    pub fn with_color(position: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            position,
            color,
            intensity,
        }
    }
}
