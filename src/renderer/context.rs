//! Render Context
//!
//! Owns the wgpu device/queue/surface plus every GPU-side resource: vertex
//! and index buffers, texture images and samplers, compiled shader programs
//! and the per-frame uniform buffers. Resources are uploaded once during
//! scene setup, then referenced by id from the draw path — the render loop
//! itself never allocates.

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use rustc_hash::FxHashMap;
use wgpu::util::DeviceExt;

use crate::errors::{AuraError, Result};
use crate::renderer::program::{
    CompiledProgram, ProgramCache, ProgramId, ShaderDescriptor, ShaderState, generate_wgsl,
};
use crate::renderer::uniforms::{DrawUniforms, FrameBundle, FrameUniforms};
use crate::resources::geometry::Geometry;
use crate::resources::texture::{Texture, TextureSampler};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const INITIAL_DRAW_CAPACITY: u32 = 64;

/// GPU 端几何体资源（每个属性一个 buffer）
pub(crate) struct GpuGeometry {
    pub position_buffer: wgpu::Buffer,
    pub normal_buffer: wgpu::Buffer,
    pub uv_buffer: Option<wgpu::Buffer>,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

/// GPU 端纹理资源（默认视图 + 采样器；物理纹理由视图持有）
pub(crate) struct GpuTexture {
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub version: u64,
}

enum RenderTarget {
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    Offscreen {
        _texture: wgpu::Texture,
        view: wgpu::TextureView,
        width: u32,
        height: u32,
    },
}

pub struct RenderContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,

    target: RenderTarget,
    target_format: wgpu::TextureFormat,
    depth_view: wgpu::TextureView,

    clear_color: wgpu::Color,
    depth_test: bool,

    // ==== 资源表 ====
    geometries: FxHashMap<u64, GpuGeometry>,
    textures: FxHashMap<u64, GpuTexture>,
    programs: ProgramCache,

    // ==== 共享 BindGroup 布局 ====
    frame_layout: wgpu::BindGroupLayout,
    draw_layout: wgpu::BindGroupLayout,

    // ==== 帧级 Uniform Buffer ====
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    draw_buffer: wgpu::Buffer,
    draw_bind_group: wgpu::BindGroup,
    draw_capacity: u32,
    draw_stride: u32,

    // 未就绪环境槽位的占位纹理（shader 的 USE_* 分支约定保证不会采样进光照结果）
    placeholder: GpuTexture,
}

impl RenderContext {
    /// Creates a context presenting to a window surface.
    pub async fn new<W>(window: W, width: u32, height: u32) -> Result<Self>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window)
            .map_err(|e| AuraError::AdapterRequestFailed(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| AuraError::AdapterRequestFailed(e.to_string()))?;

        let (device, queue) = Self::request_device(&adapter).await?;

        let mut config = surface
            .get_default_config(&adapter, width.max(1), height.max(1))
            .ok_or_else(|| {
                AuraError::AdapterRequestFailed("Surface not supported by adapter".to_string())
            })?;
        // The fragment stage applies gamma itself; keep the swapchain linear.
        config.format = config.format.remove_srgb_suffix();
        surface.configure(&device, &config);

        let target_format = config.format;
        let depth_view = Self::create_depth_texture(&device, config.width, config.height);

        Ok(Self::init_common(
            device,
            queue,
            RenderTarget::Surface { surface, config },
            target_format,
            depth_view,
        ))
    }

    /// Creates a headless context rendering into an offscreen target.
    ///
    /// Used by asset tooling (irradiance convolution) and tests.
    pub fn headless(width: u32, height: u32) -> Result<Self> {
        pollster::block_on(async {
            let instance = wgpu::Instance::default();
            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::default(),
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await
                .map_err(|e| AuraError::AdapterRequestFailed(e.to_string()))?;

            let (device, queue) = Self::request_device(&adapter).await?;

            let target_format = wgpu::TextureFormat::Rgba8Unorm;
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("Offscreen Target"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: target_format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            let depth_view = Self::create_depth_texture(&device, width, height);

            Ok(Self::init_common(
                device,
                queue,
                RenderTarget::Offscreen {
                    _texture: texture,
                    view,
                    width,
                    height,
                },
                target_format,
                depth_view,
            ))
        })
    }

    async fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue)> {
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await?;
        Ok((device, queue))
    }

    fn init_common(
        device: wgpu::Device,
        queue: wgpu::Queue,
        target: RenderTarget,
        target_format: wgpu::TextureFormat,
        depth_view: wgpu::TextureView,
    ) -> Self {
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Uniforms Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let draw_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Draw Uniforms Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame BindGroup"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let alignment = device.limits().min_uniform_buffer_offset_alignment;
        let draw_stride =
            (std::mem::size_of::<DrawUniforms>() as u32).div_ceil(alignment) * alignment;
        let (draw_buffer, draw_bind_group) =
            Self::create_draw_buffer(&device, &draw_layout, draw_stride, INITIAL_DRAW_CAPACITY);

        let placeholder = Self::upload_texture_inner(
            &device,
            &queue,
            "Placeholder",
            1,
            1,
            wgpu::TextureFormat::Rgba8Unorm,
            &[255, 255, 255, 255],
            &TextureSampler::default(),
        );

        Self {
            device,
            queue,
            target,
            target_format,
            depth_view,
            clear_color: wgpu::Color::BLACK,
            depth_test: true,
            geometries: FxHashMap::default(),
            textures: FxHashMap::default(),
            programs: ProgramCache::default(),
            frame_layout,
            draw_layout,
            frame_buffer,
            frame_bind_group,
            draw_buffer,
            draw_bind_group,
            draw_capacity: INITIAL_DRAW_CAPACITY,
            draw_stride,
            placeholder,
        }
    }

    fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn create_draw_buffer(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        stride: u32,
        capacity: u32,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw Uniforms"),
            size: u64::from(stride) * u64::from(capacity),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw BindGroup"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<DrawUniforms>() as u64),
                }),
            }],
        });
        (buffer, bind_group)
    }

    // ========================================================================
    // 帧状态
    // ========================================================================

    pub fn set_clear_color(&mut self, color: wgpu::Color) {
        self.clear_color = color;
    }

    /// Depth testing is baked into the pipelines at compile time; change this
    /// before compiling scene programs.
    pub fn set_depth_test(&mut self, enabled: bool) {
        self.depth_test = enabled;
    }

    /// Recomputes the drawing-buffer dimensions after a surface resize.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if let RenderTarget::Surface { surface, config } = &mut self.target {
            config.width = width;
            config.height = height;
            surface.configure(&self.device, config);
            self.depth_view = Self::create_depth_texture(&self.device, width, height);
        }
    }

    /// Current drawable dimensions.
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        match &self.target {
            RenderTarget::Surface { config, .. } => (config.width, config.height),
            RenderTarget::Offscreen { width, height, .. } => (*width, *height),
        }
    }

    #[must_use]
    pub fn aspect(&self) -> f32 {
        let (w, h) = self.size();
        w as f32 / h.max(1) as f32
    }

    // ========================================================================
    // 资源上传
    // ========================================================================

    /// Uploads vertex and index buffers for `geometry`.
    ///
    /// Idempotent per geometry identity; must be called before any draw that
    /// references it. Layout validation failure is fatal for the geometry.
    pub fn upload_geometry(&mut self, geometry: &Geometry) -> Result<()> {
        if self.geometries.contains_key(&geometry.id()) {
            return Ok(());
        }
        geometry.validate()?;

        let position_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Positions", geometry.name)),
                contents: bytemuck::cast_slice(&geometry.positions),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let normal_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Normals", geometry.name)),
                contents: bytemuck::cast_slice(&geometry.normals),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let uv_buffer = geometry.uvs.as_ref().map(|uvs| {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} UVs", geometry.name)),
                    contents: bytemuck::cast_slice(uvs),
                    usage: wgpu::BufferUsages::VERTEX,
                })
        });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Indices", geometry.name)),
                contents: bytemuck::cast_slice(&geometry.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        self.geometries.insert(
            geometry.id(),
            GpuGeometry {
                position_buffer,
                normal_buffer,
                uv_buffer,
                index_buffer,
                index_count: geometry.index_count(),
            },
        );
        Ok(())
    }

    /// Uploads `texture`'s pixel data to a GPU image.
    ///
    /// Idempotent per image identity and version; a version bump on the
    /// CPU image triggers a fresh upload on the next call.
    pub fn upload_texture(&mut self, texture: &Texture) -> Result<()> {
        let image = &texture.image;
        if let Some(existing) = self.textures.get(&image.id())
            && existing.version == image.version()
        {
            return Ok(());
        }

        let pixels = image.with_data(<[u8]>::to_vec).ok_or_else(|| {
            AuraError::ImageDecodeError(format!("{} has no CPU pixel data", texture.name))
        })?;

        let expected = (image.width() * image.height() * image.bytes_per_pixel()) as usize;
        if pixels.len() < expected {
            return Err(AuraError::ImageDecodeError(format!(
                "{}: pixel buffer is {} bytes, format/size require {expected}",
                texture.name,
                pixels.len()
            )));
        }

        let mut gpu = Self::upload_texture_inner(
            &self.device,
            &self.queue,
            &texture.name,
            image.width(),
            image.height(),
            image.format(),
            &pixels,
            &texture.sampler,
        );
        gpu.version = image.version();
        self.textures.insert(image.id(), gpu);
        Ok(())
    }

    fn upload_texture_inner(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        pixels: &[u8],
        sampler: &TextureSampler,
    ) -> GpuTexture {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let block_size = format.block_copy_size(None).unwrap_or(4);
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * block_size),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: sampler.address_mode_u,
            address_mode_v: sampler.address_mode_v,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: sampler.mag_filter,
            min_filter: sampler.min_filter,
            mipmap_filter: sampler.mipmap_filter,
            ..Default::default()
        });

        GpuTexture {
            view,
            sampler,
            version: 1,
        }
    }

    pub(crate) fn gpu_texture(&self, image_id: u64) -> Option<&GpuTexture> {
        self.textures.get(&image_id)
    }

    // ========================================================================
    // 程序编译
    // ========================================================================

    /// Compiles (or fetches from cache) the program for `shader`.
    ///
    /// Template or WGSL failure is fatal for this shader: the descriptor
    /// moves to `Failed`, the diagnostic names the stage, and no partial or
    /// fallback program is installed.
    pub fn compile_program(&mut self, shader: &mut ShaderDescriptor) -> Result<ProgramId> {
        if let ShaderState::Compiled(id) = shader.state {
            return Ok(id);
        }

        let key = shader.cache_key();
        if let Some(id) = self.programs.get_by_key(key) {
            shader.state = ShaderState::Compiled(id);
            return Ok(id);
        }

        shader.state = ShaderState::Compiling;

        let source = match generate_wgsl(shader) {
            Ok(source) => source,
            Err(err) => {
                shader.state = ShaderState::Failed;
                log::error!("Shader '{}' generation failed: {err}", shader.name);
                return Err(err);
            }
        };

        // Trap WGSL compile errors so the diagnostic reaches the caller
        let error_scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = self.build_pipeline(shader, &source);
        if let Some(err) = pollster::block_on(error_scope.pop()) {
            shader.state = ShaderState::Failed;
            log::error!("Shader '{}' compilation failed: {err}", shader.name);
            return Err(AuraError::ShaderCompile {
                stage: "wgsl",
                log: err.to_string(),
            });
        }

        let program = CompiledProgram {
            name: shader.name.clone(),
            pipeline: pipeline.pipeline,
            env_layout: pipeline.env_layout,
            point_light_count: shader.point_light_count(),
            uses_diffuse: shader.uses_diffuse(),
            uses_specular: shader.uses_specular(),
            uses_uv: shader.uses_uv(),
        };
        let id = self.programs.insert(key, program);
        shader.state = ShaderState::Compiled(id);
        log::info!("Compiled shader '{}' ({:?})", shader.name, key);
        Ok(id)
    }

    fn build_pipeline(&mut self, shader: &ShaderDescriptor, source: &str) -> BuiltPipeline {
        let env_layout = self.create_env_layout(shader);

        let module = self
            .programs
            .get_or_compile_module(&self.device, &shader.name, source)
            .clone();

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&format!("{} Pipeline Layout", shader.name)),
                bind_group_layouts: &[&self.frame_layout, &env_layout, &self.draw_layout],
                immediate_size: 0,
            });

        let mut vertex_buffers = vec![
            wgpu::VertexBufferLayout {
                array_stride: 12,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x3,
                    offset: 0,
                    shader_location: 0,
                }],
            },
            wgpu::VertexBufferLayout {
                array_stride: 12,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x3,
                    offset: 0,
                    shader_location: 1,
                }],
            },
        ];
        if shader.uses_uv() {
            vertex_buffers.push(wgpu::VertexBufferLayout {
                array_stride: 8,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x2,
                    offset: 0,
                    shader_location: 2,
                }],
            });
        }

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&format!("{} Pipeline", shader.name)),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: Some("vs_main"),
                    buffers: &vertex_buffers,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.target_format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: self.depth_test,
                    depth_compare: if self.depth_test {
                        wgpu::CompareFunction::Less
                    } else {
                        wgpu::CompareFunction::Always
                    },
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });

        BuiltPipeline {
            pipeline,
            env_layout,
        }
    }

    fn create_env_layout(&self, shader: &ShaderDescriptor) -> wgpu::BindGroupLayout {
        let texture_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };

        let mut entries = Vec::new();
        if shader.uses_diffuse() {
            entries.push(texture_entry(0));
        }
        if shader.uses_specular() {
            entries.push(texture_entry(1));
            entries.push(texture_entry(2));
        }
        if shader.uses_diffuse() || shader.uses_specular() {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            });
        }

        self.device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&format!("{} Environment Layout", shader.name)),
                entries: &entries,
            })
    }

    // ========================================================================
    // 帧提交
    // ========================================================================

    /// Submits one assembled frame: one indexed draw per [`DrawCommand`], in
    /// bundle order.
    pub fn submit_frame(&mut self, program: ProgramId, bundle: &FrameBundle) -> Result<()> {
        // 1. Frame-level uniforms
        self.queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&bundle.frame));

        // 2. Per-draw uniforms at aligned offsets
        let draw_count = bundle.draws.len() as u32;
        if draw_count > self.draw_capacity {
            let capacity = draw_count.next_power_of_two();
            let (buffer, bind_group) = Self::create_draw_buffer(
                &self.device,
                &self.draw_layout,
                self.draw_stride,
                capacity,
            );
            self.draw_buffer = buffer;
            self.draw_bind_group = bind_group;
            self.draw_capacity = capacity;
            log::info!("Draw uniform buffer grown to {capacity} entries");
        }
        let mut draw_bytes = vec![0u8; (self.draw_stride * draw_count.max(1)) as usize];
        for (i, draw) in bundle.draws.iter().enumerate() {
            let start = i * self.draw_stride as usize;
            let data = bytemuck::bytes_of(&draw.uniforms);
            draw_bytes[start..start + data.len()].copy_from_slice(data);
        }
        self.queue.write_buffer(&self.draw_buffer, 0, &draw_bytes);

        // 3. Resolve program and resources (read-only from here on)
        let program = self
            .programs
            .get(program)
            .ok_or_else(|| AuraError::ProgramNotCompiled("invalid program id".to_string()))?;

        let env_bind_group = self.create_env_bind_group(program, bundle)?;

        let mut draws = Vec::with_capacity(bundle.draws.len());
        for command in &bundle.draws {
            let geometry = self.geometries.get(&command.geometry).ok_or_else(|| {
                AuraError::ResourceNotUploaded(format!("geometry {}", command.geometry))
            })?;
            if program.uses_uv && geometry.uv_buffer.is_none() {
                return Err(AuraError::ConfigMismatch(format!(
                    "program '{}' requires UVs but geometry {} has none",
                    program.name, command.geometry
                )));
            }
            draws.push(geometry);
        }

        // 4. Acquire the target and encode the pass
        let surface_frame = match &self.target {
            RenderTarget::Surface { surface, .. } => Some(surface.get_current_texture()?),
            RenderTarget::Offscreen { .. } => None,
        };
        let target_view = match (&surface_frame, &self.target) {
            (Some(frame), _) => frame
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default()),
            (None, RenderTarget::Offscreen { view, .. }) => view.clone(),
            _ => unreachable!(),
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Forward Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            pass.set_pipeline(&program.pipeline);
            pass.set_bind_group(0, &self.frame_bind_group, &[]);
            pass.set_bind_group(1, &env_bind_group, &[]);

            for (i, geometry) in draws.iter().enumerate() {
                let offset = i as u32 * self.draw_stride;
                pass.set_bind_group(2, &self.draw_bind_group, &[offset]);
                pass.set_vertex_buffer(0, geometry.position_buffer.slice(..));
                pass.set_vertex_buffer(1, geometry.normal_buffer.slice(..));
                if program.uses_uv
                    && let Some(uv_buffer) = &geometry.uv_buffer
                {
                    pass.set_vertex_buffer(2, uv_buffer.slice(..));
                }
                pass.set_index_buffer(geometry.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..geometry.index_count, 0, 0..1);
            }
        }

        self.queue.submit(Some(encoder.finish()));
        if let Some(frame) = surface_frame {
            frame.present();
        }
        Ok(())
    }

    /// Resolves an environment slot to its GPU texture, or the placeholder.
    fn resolve_env_slot<'a>(&'a self, texture: Option<&Texture>) -> &'a GpuTexture {
        texture
            .and_then(|t| self.textures.get(&t.image.id()))
            .unwrap_or(&self.placeholder)
    }

    /// Binds resolved environment textures, the placeholder for the rest.
    fn create_env_bind_group(
        &self,
        program: &CompiledProgram,
        bundle: &FrameBundle,
    ) -> Result<wgpu::BindGroup> {
        let env = &bundle.environment;

        let mut entries = Vec::new();
        if program.uses_diffuse {
            entries.push(wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(
                    &self.resolve_env_slot(env.diffuse.as_ref()).view,
                ),
            });
        }
        if program.uses_specular {
            entries.push(wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(
                    &self.resolve_env_slot(env.specular.as_ref()).view,
                ),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(
                    &self.resolve_env_slot(env.brdf_pre_int.as_ref()).view,
                ),
            });
        }
        if program.uses_diffuse || program.uses_specular {
            let sampler_source = if program.uses_diffuse {
                self.resolve_env_slot(env.diffuse.as_ref())
            } else {
                self.resolve_env_slot(env.specular.as_ref())
            };
            entries.push(wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::Sampler(&sampler_source.sampler),
            });
        }

        Ok(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Environment BindGroup"),
            layout: &program.env_layout,
            entries: &entries,
        }))
    }
}

struct BuiltPipeline {
    pipeline: wgpu::RenderPipeline,
    env_layout: wgpu::BindGroupLayout,
}
