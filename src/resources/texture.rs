use uuid::Uuid;
use wgpu::{AddressMode, TextureFormat};

use crate::resources::encoding::RGBM_MAX_RANGE;
use crate::resources::image::Image;

// ============================================================================
// 1. 采样器状态
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureSampler {
    pub address_mode_u: wgpu::AddressMode,
    pub address_mode_v: wgpu::AddressMode,
    pub mag_filter: wgpu::FilterMode,
    pub min_filter: wgpu::FilterMode,
    pub mipmap_filter: wgpu::MipmapFilterMode,
}

impl Default for TextureSampler {
    fn default() -> Self {
        Self {
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Linear,
        }
    }
}

// ============================================================================
// 2. 颜色编码
// ============================================================================

/// How the pixel values of a texture map to linear radiance.
///
/// `Rgbm` textures must be decoded as `rgb * alpha * max_range` before any
/// lighting use; the `max_range` constant is shared between every writer and
/// reader (see [`crate::resources::encoding`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorEncoding {
    /// Values are linear radiance as stored.
    Linear,
    /// Values are sRGB-encoded, converted to linear in the shader.
    Srgb,
    /// Shared-exponent RGBM encoding with the given range multiplier.
    Rgbm { max_range: f32 },
}

impl ColorEncoding {
    /// The RGBM convention used by every environment asset in this engine.
    #[must_use]
    pub fn rgbm() -> Self {
        Self::Rgbm {
            max_range: RGBM_MAX_RANGE,
        }
    }
}

// ============================================================================
// 3. Texture Asset
// ============================================================================

/// CPU 端纹理资源：Image + 采样参数 + 颜色编码
///
/// GPU 句柄由 RenderContext 按 `image.id()` 持有，本类型只描述数据。
#[derive(Debug, Clone)]
pub struct Texture {
    pub uuid: Uuid,
    pub name: String,

    pub image: Image,
    pub sampler: TextureSampler,
    pub encoding: ColorEncoding,
}

impl Texture {
    /// 基础构造：从现有 Image 创建 Texture
    pub fn new(name: &str, image: Image, encoding: ColorEncoding) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.to_string(),
            image,
            sampler: TextureSampler::default(),
            encoding,
        }
    }

    /// 辅助构造：创建 2D 纹理 (自动创建 Image)
    pub fn new_2d(
        name: &str,
        width: u32,
        height: u32,
        data: Option<Vec<u8>>,
        format: TextureFormat,
        encoding: ColorEncoding,
    ) -> Self {
        let image = Image::new(name, width, height, format, data);
        Self::new(name, image, encoding)
    }

    /// 辅助构造：等距柱状环境贴图 (RGBM 编码)
    ///
    /// 水平方向 Repeat（经度环绕），垂直方向 Clamp（极点）。
    pub fn new_equirect(name: &str, width: u32, height: u32, data: Option<Vec<u8>>) -> Self {
        let mut tex = Self::new_2d(
            name,
            width,
            height,
            data,
            TextureFormat::Rgba8Unorm,
            ColorEncoding::rgbm(),
        );
        tex.sampler.address_mode_u = AddressMode::Repeat;
        tex.sampler.address_mode_v = AddressMode::ClampToEdge;
        tex
    }

    /// 辅助：创建纯色纹理 (1x1)
    #[must_use]
    pub fn create_solid_color(name: &str, color: [u8; 4]) -> Texture {
        Self::new_2d(
            name,
            1,
            1,
            Some(color.to_vec()),
            TextureFormat::Rgba8Unorm,
            ColorEncoding::Linear,
        )
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }
}
