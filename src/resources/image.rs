use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

// Global Image ID generator (uses u64 for high-performance map lookups)
static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

/// 图像数据 (CPU 副本)
///
/// 渲染器通过 `id` 关联 GPU 端资源，`version` 变化时触发重新上传。
#[derive(Debug)]
pub struct ImageInner {
    pub id: u64,
    pub uuid: Uuid,
    pub label: String,

    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,

    // 数据内容 (pixels)
    pub data: RwLock<Option<Vec<u8>>>,

    pub version: AtomicU64,
}

/// Shared handle to an [`ImageInner`].
///
/// Cloning is cheap; identity (and GPU-resource identity) is the inner `id`,
/// not the pixel contents.
#[derive(Debug, Clone)]
pub struct Image(Arc<ImageInner>);

impl PartialEq for Image {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}
impl Eq for Image {}
impl std::hash::Hash for Image {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl Image {
    pub fn new(
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        data: Option<Vec<u8>>,
    ) -> Self {
        Self(Arc::new(ImageInner {
            id: NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed),
            uuid: Uuid::new_v4(),
            label: label.to_string(),
            width,
            height,
            format,
            data: RwLock::new(data),
            version: AtomicU64::new(1),
        }))
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.0.id
    }

    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0.uuid
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.0.version.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.0.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.0.height
    }

    #[must_use]
    pub fn format(&self) -> wgpu::TextureFormat {
        self.0.format
    }

    /// Bytes per pixel of the declared format.
    #[must_use]
    pub fn bytes_per_pixel(&self) -> u32 {
        self.0.format.block_copy_size(None).unwrap_or(4)
    }

    /// Updates the pixel data, bumping the version so the renderer re-uploads.
    pub fn update_data(&self, data: Vec<u8>) {
        let mut lock = self.0.data.write().expect("Image data lock poisoned");
        *lock = Some(data);
        self.0.version.fetch_add(1, Ordering::Relaxed);
    }

    /// Runs `f` over the pixel data, if present.
    pub fn with_data<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Option<R> {
        let lock = self.0.data.read().expect("Image data lock poisoned");
        lock.as_deref().map(f)
    }
}

// Deref for convenient read-only access to inner data
impl std::ops::Deref for Image {
    type Target = ImageInner;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
