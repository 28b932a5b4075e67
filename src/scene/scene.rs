use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};

use glam::{Mat3A, Vec3};

use crate::errors::{AuraError, Result};
use crate::renderer::RenderContext;
use crate::renderer::program::{ProgramId, ShaderDescriptor};
use crate::renderer::uniforms::{
    DrawCommand, DrawUniforms, EnvironmentBinding, FrameBundle, FrameUniforms, GpuPointLight,
    MAX_POINT_LIGHTS,
};
use crate::scene::camera::Camera;
use crate::scene::environment::Environment;
use crate::scene::light::PointLight;
use crate::scene::model::Model;

static NEXT_SCENE_ID: AtomicU32 = AtomicU32::new(1);

/// 渲染循环每帧读取的可变配置（由外部参数面板写入）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneConfig {
    /// When set, replaces every model's material albedo for the frame.
    pub albedo_override: Option<Vec3>,
    /// Added to every light's world position for the frame.
    pub light_offset: Vec3,
}

/// 场景：Camera(共享) + Models + Lights + Environment，组成一个渲染 Pass
///
/// Model 的插入顺序就是绘制顺序。每帧的 uniform 装配是确定性的：
/// 相同的场景状态和相机两次装配产生完全相同的 FrameBundle。
pub struct Scene {
    pub id: u32,

    pub models: Vec<Model>,
    pub lights: Vec<PointLight>,
    pub shader: ShaderDescriptor,
    pub environment: Option<Environment>,
    pub config: SceneConfig,

    program: Option<ProgramId>,
}

impl Scene {
    #[must_use]
    pub fn new(shader: ShaderDescriptor) -> Self {
        Self {
            id: NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed),
            models: Vec::new(),
            lights: Vec::new(),
            shader,
            environment: None,
            config: SceneConfig::default(),
            program: None,
        }
    }

    pub fn add_model(&mut self, model: Model) {
        self.models.push(model);
    }

    pub fn add_light(&mut self, light: PointLight) {
        self.lights.push(light);
    }

    pub fn set_environment(&mut self, environment: Environment) {
        self.environment = Some(environment);
    }

    #[must_use]
    pub fn program(&self) -> Option<ProgramId> {
        self.program
    }

    /// 初始化：上传所有几何体、编译 shader、启动环境贴图上传
    ///
    /// All uploads happen here, not inside the render loop; setup failure
    /// (bad geometry, shader compile error) aborts initialization of this
    /// scene and propagates.
    pub fn init(&mut self, ctx: &mut RenderContext) -> Result<()> {
        let mut seen = HashSet::new();
        for model in &self.models {
            if seen.insert(model.geometry.id()) {
                ctx.upload_geometry(&model.geometry)?;
            }
        }

        self.program = Some(ctx.compile_program(&mut self.shader)?);

        // Environment textures may still be loading; whatever is ready now
        // goes up immediately, the rest on later polls.
        if let Some(env) = &mut self.environment {
            env.poll(ctx)?;
        }

        log::info!(
            "Scene {} initialized: {} models, {} lights, shader '{}'",
            self.id,
            self.models.len(),
            self.lights.len(),
            self.shader.name
        );
        Ok(())
    }

    /// 每帧更新：重组所有模型矩阵
    pub fn update(&mut self) {
        for model in &mut self.models {
            model.update();
        }
    }

    /// 装配一帧的完整 uniform 数据
    ///
    /// The per-draw uniforms are written unconditionally from the scene-level
    /// base, so nothing set for one model can leak into the next.
    pub fn assemble(&mut self, camera: &Camera) -> Result<FrameBundle> {
        // Light count is baked into the compiled program; a mismatch would
        // read garbage lights in the shader, so reject it here.
        let expected = self.shader.point_light_count();
        if expected > 0 && expected != self.lights.len() {
            return Err(AuraError::ConfigMismatch(format!(
                "shader '{}' compiled for {expected} point lights, scene has {}",
                self.shader.name,
                self.lights.len()
            )));
        }
        if expected > MAX_POINT_LIGHTS {
            return Err(AuraError::ConfigMismatch(format!(
                "POINT_LIGHT_COUNT {expected} exceeds the maximum of {MAX_POINT_LIGHTS}"
            )));
        }

        let mut frame = FrameUniforms {
            camera_position: camera.transform.position,
            ..Default::default()
        };
        for (i, light) in self.lights.iter().take(MAX_POINT_LIGHTS).enumerate() {
            frame.point_lights[i] = GpuPointLight {
                color: light.color,
                intensity: light.intensity,
                position: light.position + self.config.light_offset,
                _pad: 0.0,
            };
        }

        let environment = self
            .environment
            .as_ref()
            .map(|env| EnvironmentBinding {
                diffuse: env.resolved_diffuse().cloned(),
                specular: env.resolved_specular().cloned(),
                brdf_pre_int: env.resolved_brdf_pre_int().cloned(),
            })
            .unwrap_or_default();

        let view_projection = camera.local_to_projection();

        let mut draws = Vec::with_capacity(self.models.len());
        for model in &mut self.models {
            let model_matrix = model.transform.combine();
            let normal_matrix = Mat3A::from_mat4(model_matrix).inverse().transpose();

            let material = &model.material;
            let albedo = self.config.albedo_override.unwrap_or(material.albedo);

            draws.push(DrawCommand {
                geometry: model.geometry.id(),
                uniforms: DrawUniforms {
                    view_projection,
                    model: model_matrix,
                    normal_matrix,
                    albedo,
                    metallic: material.metallic,
                    roughness: material.clamped_roughness(),
                    ao: material.ao,
                    _pad: [0.0; 2],
                },
            });
        }

        Ok(FrameBundle {
            frame,
            environment,
            draws,
        })
    }

    /// 渲染一帧：更新相机/环境，装配 uniforms，提交绘制
    ///
    /// Draws proceed with whatever environment textures have resolved so
    /// far — a scene with zero resolved textures still completes the pass,
    /// just with image-based lighting contributing nothing yet.
    pub fn render(&mut self, ctx: &mut RenderContext, camera: &mut Camera) -> Result<()> {
        let program = self
            .program
            .ok_or_else(|| AuraError::ProgramNotCompiled(self.shader.name.clone()))?;

        camera.update();

        if let Some(env) = &mut self.environment {
            env.poll(ctx)?;
        }

        let bundle = self.assemble(camera)?;
        ctx.submit_frame(program, &bundle)
    }
}
