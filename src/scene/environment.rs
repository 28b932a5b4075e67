//! Environment - IBL 纹理槽位
//!
//! 三个槽位分别对应漫反射辐照度贴图、预过滤镜面反射图集和 BRDF 预积分 LUT。
//! 每个槽位都可能仍在异步解码中；未就绪的槽位在装配 uniform 时直接缺席。

use crate::assets::{AsyncTexture, LoadState, TextureLoader};
use crate::errors::Result;
use crate::renderer::RenderContext;
use crate::resources::texture::{ColorEncoding, Texture};

/// IBL 环境贴图配置
#[derive(Debug, Default)]
pub struct Environment {
    /// 漫反射辐照度贴图 (RGBM equirect)
    pub diffuse: Option<AsyncTexture>,
    /// 预过滤镜面反射 mip 图集 (RGBM)
    pub specular: Option<AsyncTexture>,
    /// BRDF 预积分 LUT
    pub brdf_pre_int: Option<AsyncTexture>,
}

impl Environment {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 从三个资产路径发起加载
    pub fn from_paths(
        loader: &TextureLoader,
        diffuse_path: &str,
        specular_path: &str,
        brdf_path: &str,
    ) -> Self {
        Self {
            diffuse: Some(loader.load(diffuse_path, ColorEncoding::rgbm())),
            specular: Some(loader.load(specular_path, ColorEncoding::rgbm())),
            brdf_pre_int: Some(loader.load(brdf_path, ColorEncoding::Linear)),
        }
    }

    /// 注入已就绪的漫反射贴图（例如辐照度卷积的输出）
    pub fn set_diffuse(&mut self, texture: Texture) {
        self.diffuse = Some(AsyncTexture::ready(texture));
    }

    pub fn set_specular(&mut self, texture: Texture) {
        self.specular = Some(AsyncTexture::ready(texture));
    }

    pub fn set_brdf_pre_int(&mut self, texture: Texture) {
        self.brdf_pre_int = Some(AsyncTexture::ready(texture));
    }

    /// 每帧调用：轮询未决的加载，新就绪的纹理立即上传
    ///
    /// Upload happens here — outside the draw path — so the render loop never
    /// uploads mid-frame.
    pub fn poll(&mut self, ctx: &mut RenderContext) -> Result<()> {
        for slot in [&mut self.diffuse, &mut self.specular, &mut self.brdf_pre_int]
            .into_iter()
            .flatten()
        {
            if slot.poll() == LoadState::Ready {
                // idempotent per image identity
                let texture = slot.texture().expect("polled Ready");
                ctx.upload_texture(texture)?;
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn resolved_diffuse(&self) -> Option<&Texture> {
        self.diffuse.as_ref().and_then(AsyncTexture::texture)
    }

    #[must_use]
    pub fn resolved_specular(&self) -> Option<&Texture> {
        self.specular.as_ref().and_then(AsyncTexture::texture)
    }

    #[must_use]
    pub fn resolved_brdf_pre_int(&self) -> Option<&Texture> {
        self.brdf_pre_int.as_ref().and_then(AsyncTexture::texture)
    }

    /// 是否有任何已就绪的贴图
    #[must_use]
    pub fn has_any_resolved(&self) -> bool {
        self.resolved_diffuse().is_some()
            || self.resolved_specular().is_some()
            || self.resolved_brdf_pre_int().is_some()
    }
}
