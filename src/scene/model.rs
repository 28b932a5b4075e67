use std::sync::Arc;

use crate::resources::geometry::Geometry;
use crate::resources::material::PbrMaterial;
use crate::scene::transform::Transform;

/// Model = Geometry + Transform + Material
///
/// Geometry 是共享的（同一个球体网格可以被几十个 Model 引用）；
/// Transform 和 Material 每个 Model 独占。
#[derive(Debug, Clone)]
pub struct Model {
    pub geometry: Arc<Geometry>,
    pub transform: Transform,
    pub material: PbrMaterial,
}

impl Model {
    #[must_use]
    pub fn new(geometry: Arc<Geometry>) -> Self {
        Self {
            geometry,
            transform: Transform::new(),
            material: PbrMaterial::default(),
        }
    }

    #[must_use]
    pub fn with_material(geometry: Arc<Geometry>, material: PbrMaterial) -> Self {
        Self {
            geometry,
            transform: Transform::new(),
            material,
        }
    }

    /// 每帧调用：重组变换矩阵
    pub fn update(&mut self) {
        self.transform.combine();
    }
}
