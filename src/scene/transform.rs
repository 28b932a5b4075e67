use glam::{Mat4, Quat, Vec3};

/// Transform 组件
///
/// 封装了位置、旋转、缩放（TRS）以及矩阵缓存和脏检查逻辑。
/// 矩阵始终是 `translate * rotate * scale`；[`Transform::combine`] 是缓存的
/// 唯一写入口，两次 combine 之间缓存可能是过期的。
#[derive(Debug, Clone)]
pub struct Transform {
    // === Public 属性 ===
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,

    // === 矩阵缓存 (Internal) ===
    matrix: Mat4,

    // === 脏检查状态 (Private) ===
    last_position: Vec3,
    last_rotation: Quat,
    last_scale: Vec3,
    force_update: bool,
}

impl Transform {
    #[must_use]
    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,

            matrix: Mat4::IDENTITY,

            last_position: Vec3::ZERO,
            last_rotation: Quat::IDENTITY,
            last_scale: Vec3::ONE,
            force_update: true,
        }
    }

    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        let mut t = Self::new();
        t.position = position;
        t
    }

    // ========================================================================
    // 核心逻辑：智能更新 (Shadow State Check)
    // ========================================================================

    /// 重算并返回矩阵 (`T * R * S`)
    ///
    /// 脏检查：对比当前 pub 属性和 last 私有属性，只有变了才重算。
    pub fn combine(&mut self) -> Mat4 {
        let changed = self.position != self.last_position
            || self.rotation != self.last_rotation
            || self.scale != self.last_scale
            || self.force_update;

        if changed {
            self.matrix = Mat4::from_scale_rotation_translation(
                self.scale,
                self.rotation,
                self.position,
            );

            // 同步影子状态
            self.last_position = self.position;
            self.last_rotation = self.rotation;
            self.last_scale = self.scale;
            self.force_update = false;
        }

        self.matrix
    }

    // ========================================================================
    // Getters & Helpers
    // ========================================================================

    /// 获取缓存的矩阵（不触发重算，可能过期）
    #[inline]
    #[must_use]
    pub fn matrix(&self) -> &Mat4 {
        &self.matrix
    }

    /// 手动标记脏（例如用于强制刷新）
    pub fn mark_dirty(&mut self) {
        self.force_update = true;
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}
