//! Shader specialization tests
//!
//! Tests for:
//! - Define-driven variant isolation (disabled branches absent from WGSL)
//! - Specialization key stability (same defines -> same cache key)
//! - Frozen defines after compilation state transitions
//! - Unknown defines rejected at generation time

use aura::errors::AuraError;
use aura::renderer::program::{ShaderDescriptor, ShaderState, generate_wgsl};

// ============================================================================
// Variant isolation
// ============================================================================

#[test]
fn ibl_diffuse_only_omits_specular_bindings() {
    let shader = ShaderDescriptor::ibl(true, false);
    let wgsl = generate_wgsl(&shader).unwrap();

    assert!(wgsl.contains("env_diffuse"));
    assert!(wgsl.contains("env_sampler"));
    assert!(
        !wgsl.contains("env_specular"),
        "disabled specular branch leaked into the binding set"
    );
    assert!(!wgsl.contains("env_brdf"));
    assert!(!wgsl.contains("fetch_prefiltered_spec"));
}

#[test]
fn ibl_both_branches_present_when_enabled() {
    let shader = ShaderDescriptor::ibl(true, true);
    let wgsl = generate_wgsl(&shader).unwrap();

    assert!(wgsl.contains("env_diffuse"));
    assert!(wgsl.contains("env_specular"));
    assert!(wgsl.contains("env_brdf"));
    assert!(wgsl.contains("fetch_prefiltered_spec"));
}

#[test]
fn lights_variant_bakes_light_count() {
    let shader = ShaderDescriptor::lights(4);
    let wgsl = generate_wgsl(&shader).unwrap();

    assert!(wgsl.contains("array<PointLight, 4>"));
    assert!(wgsl.contains("i < 4u"));
    // No environment sampling in the pure direct-lighting variant
    assert!(!wgsl.contains("env_diffuse"));
    assert!(!wgsl.contains("env_sampler"));
}

#[test]
fn zero_lights_omits_light_loop() {
    let shader = ShaderDescriptor::ibl(true, true);
    let wgsl = generate_wgsl(&shader).unwrap();

    assert!(!wgsl.contains("point_lights"));
    assert!(!wgsl.contains("distribution_ggx"));
}

// ============================================================================
// Specialization keys
// ============================================================================

#[test]
fn same_defines_same_cache_key() {
    let a = ShaderDescriptor::ibl(true, false);
    let b = ShaderDescriptor::ibl(true, false);
    assert_eq!(a.cache_key(), b.cache_key());

    let c = ShaderDescriptor::ibl(true, true);
    assert_ne!(a.cache_key(), c.cache_key());
}

#[test]
fn light_count_changes_cache_key() {
    assert_ne!(
        ShaderDescriptor::lights(2).cache_key(),
        ShaderDescriptor::lights(4).cache_key()
    );
}

// ============================================================================
// State machine
// ============================================================================

#[test]
fn descriptor_starts_constructed_and_mutable() {
    let mut shader = ShaderDescriptor::ibl(false, false);
    assert_eq!(shader.state(), ShaderState::Constructed);

    shader.set_define("USE_DIFFUSE", "1");
    assert!(shader.uses_diffuse());
}

#[test]
fn unknown_define_is_a_generation_error() {
    let mut shader = ShaderDescriptor::ibl(true, false);
    shader.set_define("USE_SHADOW_MAP", "1");

    match generate_wgsl(&shader) {
        Err(AuraError::ShaderCompile { stage, log }) => {
            assert_eq!(stage, "template");
            assert!(log.contains("USE_SHADOW_MAP"));
        }
        other => panic!("expected ShaderCompile error, got {other:?}"),
    }
}

#[test]
fn non_integer_light_count_is_a_generation_error() {
    let mut shader = ShaderDescriptor::ibl(false, false);
    shader.set_define("POINT_LIGHT_COUNT", "many");

    assert!(matches!(
        generate_wgsl(&shader),
        Err(AuraError::ShaderCompile { stage: "template", .. })
    ));
}
