//! Asynchronous texture loading
//!
//! Decoding an image asset from storage is the only operation in the engine
//! that suspends. A load resolves to a usable [`Texture`] or to an absence
//! value on failure; callers observe "not yet resolved" and "failed" as the
//! same state (no texture) — the failure itself is reported once through the
//! log, and there is no retry.

use std::path::{Path, PathBuf};

use crate::errors::Result;
use crate::resources::texture::{ColorEncoding, Texture};
use crate::resources::image::Image;

/// 纹理加载器
///
/// 持有一个小的 tokio 运行时，在阻塞线程池上解码图片。
/// 单个实例可被多个 Scene/Environment 共用。
pub struct TextureLoader {
    runtime: tokio::runtime::Runtime,
}

impl TextureLoader {
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("aura-asset")
            .build()?;
        Ok(Self { runtime })
    }

    /// 发起一次异步加载，立即返回句柄
    ///
    /// The returned handle must be polled (each frame is fine) to observe
    /// resolution; dropping it cancels nothing but discards the result.
    pub fn load(&self, path: impl Into<PathBuf>, encoding: ColorEncoding) -> AsyncTexture {
        let path = path.into();
        let (tx, rx) = flume::bounded(1);

        self.runtime.spawn_blocking(move || {
            let outcome = match decode_texture(&path, encoding) {
                Ok(texture) => Some(texture),
                Err(err) => {
                    log::warn!("Texture load failed for {}: {err}", path.display());
                    None
                }
            };
            // Receiver may be gone if the caller discarded the handle
            let _ = tx.send(outcome);
        });

        AsyncTexture {
            rx: Some(rx),
            resolved: None,
        }
    }
}

/// 同步解码（在阻塞线程池上执行）
fn decode_texture(path: &Path, encoding: ColorEncoding) -> anyhow::Result<Texture> {
    let bytes = std::fs::read(path)?;
    let decoded = image::load_from_memory(&bytes)?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();

    // RGBM data carries its own scale in alpha and must never go through
    // sRGB hardware conversion; plain color assets may.
    let format = match encoding {
        ColorEncoding::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        ColorEncoding::Linear | ColorEncoding::Rgbm { .. } => wgpu::TextureFormat::Rgba8Unorm,
    };

    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("Texture");
    let image = Image::new(name, width, height, format, Some(rgba.into_raw()));
    let mut texture = Texture::new(name, image, encoding);
    if matches!(encoding, ColorEncoding::Rgbm { .. }) {
        // Equirect convention: wrap in longitude, clamp at the poles
        texture.sampler.address_mode_u = wgpu::AddressMode::Repeat;
        texture.sampler.address_mode_v = wgpu::AddressMode::ClampToEdge;
    }
    Ok(texture)
}

/// Load state reported by [`AsyncTexture::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Pending,
    Ready,
    Failed,
}

/// A texture slot that may still be resolving.
///
/// The per-frame assembly step polls this handle instead of relying on
/// incidental completion timing; until it is `Ready`, the slot simply
/// contributes nothing to the frame.
#[derive(Debug)]
pub struct AsyncTexture {
    rx: Option<flume::Receiver<Option<Texture>>>,
    resolved: Option<Option<Texture>>,
}

impl AsyncTexture {
    /// Wraps an already-decoded texture (e.g. the output of the irradiance
    /// convolution) in an immediately-ready handle.
    #[must_use]
    pub fn ready(texture: Texture) -> Self {
        Self {
            rx: None,
            resolved: Some(Some(texture)),
        }
    }

    /// Drains the load channel once and reports the current state.
    pub fn poll(&mut self) -> LoadState {
        if self.resolved.is_none()
            && let Some(rx) = &self.rx
            && let Ok(outcome) = rx.try_recv()
        {
            self.resolved = Some(outcome);
            self.rx = None;
        }

        match &self.resolved {
            None => LoadState::Pending,
            Some(Some(_)) => LoadState::Ready,
            Some(None) => LoadState::Failed,
        }
    }

    /// The resolved texture, if the load has completed successfully.
    #[must_use]
    pub fn texture(&self) -> Option<&Texture> {
        self.resolved.as_ref().and_then(Option::as_ref)
    }
}
