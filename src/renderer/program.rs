//! Shader Template Manager
//!
//! Shader variants are produced from one WGSL template per shader family by
//! substituting a closed set of macro definitions — the mechanism for
//! specializing compiled programs (light count, diffuse/specular toggles)
//! without runtime branching cost.
//!
//! A [`ShaderDescriptor`] is a value: template name + [`ShaderDefines`]
//! specialization key. "Kinds" of shaders are construction helpers, not
//! subclasses. Compiling twice with the same key returns the cached program.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use minijinja::syntax::SyntaxConfig;
use minijinja::{Environment, Value};
use rustc_hash::FxHashMap;
use xxhash_rust::xxh3::xxh3_128;

use crate::errors::{AuraError, Result};
use crate::resources::shader_defines::ShaderDefines;

/// The closed set of recognized defines, with their value kind.
///
/// Every key is always present in the template context (defaulting to
/// `false` / `0`), so a variant's disabled branches are dropped at template
/// time and never reach the WGSL compiler — an unknown key is a load-time
/// error, not a silent no-op.
const KNOWN_DEFINES: &[(&str, DefineKind)] = &[
    ("POINT_LIGHT_COUNT", DefineKind::Int),
    ("USE_DIFFUSE", DefineKind::Bool),
    ("USE_SPECULAR", DefineKind::Bool),
    ("USE_UV", DefineKind::Bool),
];

#[derive(Clone, Copy)]
enum DefineKind {
    Bool,
    Int,
}

static SHADER_ENV: OnceLock<Environment<'static>> = OnceLock::new();

fn get_env() -> &'static Environment<'static> {
    SHADER_ENV.get_or_init(|| {
        let mut env = Environment::new();

        let syntax = SyntaxConfig::builder()
            .block_delimiters("{$", "$}")
            .variable_delimiters("{{", "}}")
            .line_statement_prefix("$$")
            .build()
            .expect("Failed to configure Jinja2 syntax");

        env.set_syntax(syntax);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);

        env.add_template("pbr", include_str!("shaders/pbr.wgsl"))
            .expect("Invalid pbr shader template");

        env
    })
}

/// Renders the template for `descriptor` into final WGSL.
///
/// Pure — requires no GPU device; used by the compile path and directly by
/// tests that inspect variant isolation.
pub fn generate_wgsl(descriptor: &ShaderDescriptor) -> Result<String> {
    let mut ctx: BTreeMap<&str, Value> = BTreeMap::new();
    for &(key, kind) in KNOWN_DEFINES {
        ctx.insert(
            key,
            match kind {
                DefineKind::Bool => Value::from(false),
                DefineKind::Int => Value::from(0i64),
            },
        );
    }

    for (key, value) in descriptor.defines.iter() {
        let Some((_, kind)) = KNOWN_DEFINES.iter().find(|(k, _)| *k == key) else {
            return Err(AuraError::ShaderCompile {
                stage: "template",
                log: format!("unknown shader define '{key}'"),
            });
        };
        let rendered = match kind {
            DefineKind::Bool => Value::from(!matches!(value, "0" | "false")),
            DefineKind::Int => {
                Value::from(value.parse::<i64>().map_err(|_| AuraError::ShaderCompile {
                    stage: "template",
                    log: format!("define '{key}' expects an integer, got '{value}'"),
                })?)
            }
        };
        ctx.insert(key, rendered);
    }

    let template =
        get_env()
            .get_template(descriptor.template)
            .map_err(|e| AuraError::ShaderCompile {
                stage: "template",
                log: e.to_string(),
            })?;

    template.render(&ctx).map_err(|e| AuraError::ShaderCompile {
        stage: "template",
        log: e.to_string(),
    })
}

// ============================================================================
// Shader descriptor
// ============================================================================

/// Compilation state of a shader descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderState {
    Constructed,
    Compiling,
    Compiled(ProgramId),
    Failed,
}

/// A shader family (template) plus its specialization key.
///
/// Defines are mutable until the first compile, then frozen; mutating them
/// afterwards logs and has no effect until a new descriptor is compiled.
#[derive(Debug, Clone)]
pub struct ShaderDescriptor {
    pub name: String,
    pub(crate) template: &'static str,
    defines: ShaderDefines,
    pub(crate) state: ShaderState,
}

impl ShaderDescriptor {
    fn new(name: &str, template: &'static str, defines: ShaderDefines) -> Self {
        Self {
            name: name.to_string(),
            template,
            defines,
            state: ShaderState::Constructed,
        }
    }

    /// Direct point-light variant (Cook-Torrance, no environment sampling).
    #[must_use]
    pub fn lights(point_light_count: usize) -> Self {
        let mut defines = ShaderDefines::new();
        defines.set("POINT_LIGHT_COUNT", &point_light_count.to_string());
        Self::new("Lights", "pbr", defines)
    }

    /// Image-based-lighting variant.
    ///
    /// Enabling a branch requires the matching environment texture to be
    /// present by first draw; until then the branch samples the placeholder
    /// but the slot is observably absent from the frame.
    #[must_use]
    pub fn ibl(diffuse: bool, specular: bool) -> Self {
        let mut defines = ShaderDefines::new();
        if diffuse {
            defines.set("USE_DIFFUSE", "1");
        }
        if specular {
            defines.set("USE_SPECULAR", "1");
        }
        Self::new("IBL", "pbr", defines)
    }

    /// Sets a define. No effect after compilation until a new compile.
    pub fn set_define(&mut self, key: &str, value: &str) {
        if matches!(self.state, ShaderState::Compiled(_)) {
            log::warn!(
                "Shader '{}' already compiled; define '{key}' change has no effect",
                self.name
            );
            return;
        }
        self.defines.set(key, value);
    }

    #[must_use]
    pub fn defines(&self) -> &ShaderDefines {
        &self.defines
    }

    #[must_use]
    pub fn state(&self) -> ShaderState {
        self.state
    }

    /// Light count baked into this specialization (0 = no direct lighting).
    #[must_use]
    pub fn point_light_count(&self) -> usize {
        self.defines
            .get_int("POINT_LIGHT_COUNT")
            .unwrap_or(0)
            .max(0) as usize
    }

    #[must_use]
    pub fn uses_diffuse(&self) -> bool {
        self.defines.contains("USE_DIFFUSE")
    }

    #[must_use]
    pub fn uses_specular(&self) -> bool {
        self.defines.contains("USE_SPECULAR")
    }

    #[must_use]
    pub fn uses_uv(&self) -> bool {
        self.defines.contains("USE_UV")
    }

    /// Program cache key: (template id, specialization hash).
    #[must_use]
    pub fn cache_key(&self) -> ProgramKey {
        ProgramKey {
            template: self.template,
            defines_hash: self.defines.compute_hash(),
        }
    }
}

// ============================================================================
// Program cache
// ============================================================================

/// Handle to a compiled program owned by the render context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramKey {
    template: &'static str,
    defines_hash: u64,
}

/// A compiled, immutable shader variant with its pipeline and layouts.
pub struct CompiledProgram {
    pub name: String,
    pub pipeline: wgpu::RenderPipeline,
    pub env_layout: wgpu::BindGroupLayout,
    /// Specialization snapshot, for draw-time validation.
    pub point_light_count: usize,
    pub uses_diffuse: bool,
    pub uses_specular: bool,
    pub uses_uv: bool,
}

/// Program + shader-module caches, keyed by specialization.
#[derive(Default)]
pub struct ProgramCache {
    programs: Vec<CompiledProgram>,
    by_key: FxHashMap<ProgramKey, ProgramId>,
    /// xxh3-128 of final WGSL → compiled module.
    modules: FxHashMap<u128, wgpu::ShaderModule>,
}

impl ProgramCache {
    #[must_use]
    pub fn get_by_key(&self, key: ProgramKey) -> Option<ProgramId> {
        self.by_key.get(&key).copied()
    }

    #[must_use]
    pub fn get(&self, id: ProgramId) -> Option<&CompiledProgram> {
        self.programs.get(id.0)
    }

    pub fn insert(&mut self, key: ProgramKey, program: CompiledProgram) -> ProgramId {
        let id = ProgramId(self.programs.len());
        self.programs.push(program);
        self.by_key.insert(key, id);
        id
    }

    /// Compile a WGSL string (or return a cached module).
    pub fn get_or_compile_module(
        &mut self,
        device: &wgpu::Device,
        label: &str,
        source: &str,
    ) -> &wgpu::ShaderModule {
        let hash = xxh3_128(source.as_bytes());
        self.modules.entry(hash).or_insert_with(|| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        })
    }
}
