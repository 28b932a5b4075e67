//! Diffuse irradiance convolution
//!
//! Offline pass: reads an equirectangular RGBM environment texture and writes
//! a filtered irradiance texture of identical dimensions through an offscreen
//! color target and a full-screen draw, then reads the pixels back so the
//! result is an ordinary CPU-resident [`Texture`] usable by any scene.
//!
//! Runs once per environment asset, outside the per-frame loop. A validation
//! failure anywhere in the pass (the render-target analogue of framebuffer
//! incompleteness) aborts the convolution with [`AuraError::Convolution`] —
//! a half-written result is never returned.
//!
//! [`convolve_image`] is the CPU mirror of the WGSL kernel: same direction
//! mapping, same integration, same RGBM round-trip. It serves headless
//! callers and is the golden reference for the GPU path.

use std::f32::consts::{FRAC_PI_2, PI};

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

use crate::errors::{AuraError, Result};
use crate::renderer::RenderContext;
use crate::resources::encoding::{
    RGBM_MAX_RANGE, equirect_direction, equirect_uv, rgbm_decode_bytes, rgbm_encode_bytes,
};
use crate::resources::image::Image;
use crate::resources::texture::Texture;

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Angular integration parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvolutionSettings {
    /// Hemisphere sampling step in radians. Sensible range 0.01–0.05;
    /// smaller steps cut discretization error at quadratic cost.
    pub sample_step: f32,
    /// RGBM range shared with every reader of the output.
    pub max_range: f32,
}

impl Default for ConvolutionSettings {
    fn default() -> Self {
        Self {
            sample_step: 0.025,
            max_range: RGBM_MAX_RANGE,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct ConvolveParams {
    sample_step: f32,
    max_range: f32,
    _pad: [f32; 2],
}

/// GPU convolution pass, reusable across environment assets.
pub struct IrradianceConvolver {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
}

impl IrradianceConvolver {
    pub fn new(ctx: &RenderContext) -> Self {
        let device = &ctx.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Irradiance Convolution Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/irradiance.wgsl").into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Irradiance Source Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Irradiance Pipeline Layout"),
            bind_group_layouts: &[&layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Irradiance Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_fullscreen"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_convolve"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: TARGET_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        Self { pipeline, layout }
    }

    /// Convolves `env` on the GPU and reads the result back.
    ///
    /// The source is uploaded if it is not already GPU-resident. The returned
    /// texture is CPU-resident (pixels included) and RGBM-tagged, ready to be
    /// injected into an environment slot or saved out by an asset tool.
    pub fn convolve(
        &self,
        ctx: &mut RenderContext,
        env: &Texture,
        settings: &ConvolutionSettings,
    ) -> Result<Texture> {
        ctx.upload_texture(env)?;

        let width = env.width();
        let height = env.height();
        let device = &ctx.device;

        let source = ctx
            .gpu_texture(env.image.id())
            .ok_or_else(|| AuraError::ResourceNotUploaded(env.name.clone()))?;

        let target = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Irradiance Target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());

        let params = ConvolveParams {
            sample_step: settings.sample_step,
            max_range: settings.max_range,
            _pad: [0.0; 2],
        };
        let params_buffer = wgpu::util::DeviceExt::create_buffer_init(
            device,
            &wgpu::util::BufferInitDescriptor {
                label: Some("Irradiance Params"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            },
        );

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Irradiance BindGroup"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&source.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&source.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });

        // Buffer copies require 256-byte row alignment
        let unpadded_bytes_per_row = width * 4;
        let padded_bytes_per_row = unpadded_bytes_per_row
            .div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Irradiance Readback"),
            size: u64::from(padded_bytes_per_row) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        // Any validation failure in the pass (attachment/viewport/bind state)
        // must surface as an error, not as a silently empty result.
        let error_scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Irradiance Encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Irradiance Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        ctx.queue.submit(Some(encoder.finish()));

        if let Some(err) = pollster::block_on(error_scope.pop()) {
            return Err(AuraError::Convolution(format!(
                "render/readback pass rejected: {err}"
            )));
        }

        // Synchronous pixel transfer
        let slice = readback.slice(..);
        let (tx, rx) = flume::bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        ctx.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| AuraError::Convolution(format!("device poll failed: {e}")))?;
        rx.recv()
            .map_err(|_| AuraError::Convolution("readback channel closed".to_string()))?
            .map_err(|e| AuraError::Convolution(format!("buffer map failed: {e}")))?;

        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        {
            let data = slice.get_mapped_range();
            for row in 0..height {
                let start = (row * padded_bytes_per_row) as usize;
                pixels.extend_from_slice(&data[start..start + unpadded_bytes_per_row as usize]);
            }
        }
        readback.unmap();

        let name = format!("{}-irradiance", env.name);
        Ok(Texture::new_equirect(&name, width, height, Some(pixels)))
    }
}

// ============================================================================
// CPU reference
// ============================================================================

/// CPU mirror of the convolution kernel.
///
/// Nearest-neighbor source sampling (wrap in longitude, clamp at the poles);
/// otherwise identical math to `irradiance.wgsl`.
pub fn convolve_image(image: &Image, settings: &ConvolutionSettings) -> Result<Image> {
    if image.format() != wgpu::TextureFormat::Rgba8Unorm {
        return Err(AuraError::Convolution(format!(
            "expected Rgba8Unorm RGBM source, got {:?}",
            image.format()
        )));
    }
    let width = image.width();
    let height = image.height();
    let data = image
        .with_data(<[u8]>::to_vec)
        .ok_or_else(|| AuraError::Convolution("source has no pixel data".to_string()))?;
    if data.len() < (width * height * 4) as usize {
        return Err(AuraError::Convolution("source pixel data truncated".to_string()));
    }

    let sample = |uv: Vec2| -> Vec3 {
        let x = (uv.x.rem_euclid(1.0) * width as f32) as u32 % width;
        let y = ((uv.y * height as f32) as i64).clamp(0, i64::from(height) - 1) as u32;
        let idx = ((y * width + x) * 4) as usize;
        rgbm_decode_bytes(
            [data[idx], data[idx + 1], data[idx + 2], data[idx + 3]],
            settings.max_range,
        )
    };

    let step = settings.sample_step;
    let mut out = Vec::with_capacity(data.len());

    for y in 0..height {
        for x in 0..width {
            let uv = Vec2::new(
                (x as f32 + 0.5) / width as f32,
                (y as f32 + 0.5) / height as f32,
            );
            let n = equirect_direction(uv);

            let up = if n.y.abs() > 0.999 { Vec3::X } else { Vec3::Y };
            let tangent = up.cross(n).normalize();
            let bitangent = n.cross(tangent);

            let mut acc = Vec3::ZERO;
            let mut count = 0u32;

            let mut phi = -FRAC_PI_2;
            while phi < FRAC_PI_2 {
                let mut theta = -FRAC_PI_2;
                while theta < FRAC_PI_2 {
                    let dir = theta.cos() * (phi.cos() * n + phi.sin() * tangent)
                        + theta.sin() * bitangent;
                    acc += sample(equirect_uv(dir)) * phi.cos() * theta.cos();
                    count += 1;
                    theta += step;
                }
                phi += step;
            }

            let result = PI * acc / count as f32;
            out.extend_from_slice(&rgbm_encode_bytes(result, settings.max_range));
        }
    }

    let label = format!("{}-irradiance", image.label);
    Ok(Image::new(
        &label,
        width,
        height,
        wgpu::TextureFormat::Rgba8Unorm,
        Some(out),
    ))
}
