use glam::Mat4;

use crate::scene::transform::Transform;

/// 透视相机
///
/// 被多个 Scene 共享（不由 Scene 持有），每帧由应用更新后传入渲染。
#[derive(Debug, Clone)]
pub struct Camera {
    pub transform: Transform,

    // === 投影属性 ===
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,

    // 缓存的矩阵 renderer只读
    projection_matrix: Mat4,
}

impl Camera {
    #[must_use]
    pub fn new_perspective(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut cam = Self {
            transform: Transform::new(),
            fov: fov.to_radians(),
            aspect,
            near,
            far,
            projection_matrix: Mat4::IDENTITY,
        };

        cam.update_projection_matrix();
        cam
    }

    pub fn update_projection_matrix(&mut self) {
        // glam 的 perspective_rh 是为 WGPU/Vulkan 的 [0, 1] 深度范围设计的
        self.projection_matrix = Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far);
    }

    /// 更新宽高比（窗口 resize 后调用）
    pub fn set_aspect(&mut self, aspect: f32) {
        if (self.aspect - aspect).abs() > f32::EPSILON {
            self.aspect = aspect;
            self.update_projection_matrix();
        }
    }

    /// 每帧调用：重组变换矩阵
    pub fn update(&mut self) {
        self.transform.combine();
    }

    /// View Matrix = World Inverse
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        self.transform.matrix().inverse()
    }

    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection_matrix
    }

    /// Combined `projection * view`, shared by every draw of a pass.
    #[must_use]
    pub fn local_to_projection(&self) -> Mat4 {
        self.projection_matrix * self.view_matrix()
    }
}
