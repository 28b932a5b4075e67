use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

use crate::errors::{AuraError, Result};

static NEXT_GEOMETRY_ID: AtomicU64 = AtomicU64::new(1);

/// 几何体数据 (CPU 副本)
///
/// position/normal 必须，uv 可选。渲染器按 `id` 关联 GPU 缓冲区；
/// 上传后数据不再变化（本引擎不支持动态几何体）。
#[derive(Debug)]
pub struct Geometry {
    id: u64,
    pub uuid: Uuid,
    pub name: String,

    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Option<Vec<[f32; 2]>>,
    pub indices: Vec<u32>,
}

impl Geometry {
    pub fn new(
        name: &str,
        positions: Vec<[f32; 3]>,
        normals: Vec<[f32; 3]>,
        uvs: Option<Vec<[f32; 2]>>,
        indices: Vec<u32>,
    ) -> Self {
        Self {
            id: NEXT_GEOMETRY_ID.fetch_add(1, Ordering::Relaxed),
            uuid: Uuid::new_v4(),
            name: name.to_string(),
            positions,
            normals,
            uvs,
            indices,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn vertex_count(&self) -> u32 {
        self.positions.len() as u32
    }

    #[must_use]
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    #[must_use]
    pub fn has_uvs(&self) -> bool {
        self.uvs.is_some()
    }

    /// Checks the attribute layout before upload.
    ///
    /// Failure here is fatal for the geometry: the upload is aborted and the
    /// error reported, never retried.
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: String| {
            Err(AuraError::InvalidGeometry {
                name: self.name.clone(),
                reason,
            })
        };

        if self.positions.is_empty() {
            return fail("no position data".to_string());
        }
        if self.normals.len() != self.positions.len() {
            return fail(format!(
                "normal count {} != position count {}",
                self.normals.len(),
                self.positions.len()
            ));
        }
        if let Some(uvs) = &self.uvs
            && uvs.len() != self.positions.len()
        {
            return fail(format!(
                "uv count {} != position count {}",
                uvs.len(),
                self.positions.len()
            ));
        }
        if self.indices.is_empty() {
            return fail("no index data".to_string());
        }
        let vertex_count = self.positions.len() as u32;
        if let Some(&bad) = self.indices.iter().find(|&&i| i >= vertex_count) {
            return fail(format!("index {bad} out of range (vertex count {vertex_count})"));
        }
        Ok(())
    }
}
