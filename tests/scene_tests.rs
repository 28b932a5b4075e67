//! Scene assembly tests
//!
//! Tests for:
//! - Uniform assembly determinism (no leakage between draws or frames)
//! - Missing-environment tolerance (unresolved slots simply absent)
//! - Light-count / specialization mismatch rejection
//! - Roughness clamping at consumption time
//! - Frame-level config overrides (albedo, light offset)

use std::sync::Arc;

use glam::Vec3;

use aura::errors::AuraError;
use aura::renderer::program::ShaderDescriptor;
use aura::resources::PbrMaterial;
use aura::resources::primitives::{SphereOptions, create_sphere};
use aura::scene::{Camera, Environment, Model, PointLight, Scene};

// ============================================================================
// Helpers
// ============================================================================

fn test_camera() -> Camera {
    let mut camera = Camera::new_perspective(45.0, 1.0, 0.1, 100.0);
    camera.transform.position = Vec3::new(0.0, 0.0, 8.0);
    camera.update();
    camera
}

/// 5x5 sphere grid sweeping metallic (rows) and roughness (columns)
fn sphere_grid_scene(shader: ShaderDescriptor) -> Scene {
    let geometry = Arc::new(create_sphere(SphereOptions {
        radius: 0.4,
        width_segments: 8,
        height_segments: 6,
    }));

    let mut scene = Scene::new(shader);
    let n = 5;
    for y in 0..n {
        for x in 0..n {
            let mut model = Model::new(geometry.clone());
            let offset = (n - 1) as f32 / 2.0;
            model.transform.position = Vec3::new(x as f32 - offset, y as f32 - offset, 0.0);
            model.material.metallic = y as f32 / (n - 1) as f32;
            model.material.roughness = x as f32 / (n - 1) as f32;
            scene.add_model(model);
        }
    }
    scene
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn assembly_is_deterministic() {
    let mut scene = sphere_grid_scene(ShaderDescriptor::ibl(true, true));
    let camera = test_camera();

    let first = scene.assemble(&camera).unwrap();
    let second = scene.assemble(&camera).unwrap();
    assert_eq!(first, second);
}

#[test]
fn per_draw_uniforms_do_not_leak_between_models() {
    let mut scene = sphere_grid_scene(ShaderDescriptor::ibl(true, true));
    let camera = test_camera();
    let bundle = scene.assemble(&camera).unwrap();

    assert_eq!(bundle.draws.len(), 25);
    // Material sweep must survive assembly: first draw is (0,0), last is (1,1)
    assert!((bundle.draws[0].uniforms.metallic - 0.0).abs() < 1e-6);
    assert!((bundle.draws[24].uniforms.metallic - 1.0).abs() < 1e-6);
    // Draw order is model insertion order
    assert!(bundle.draws[0].uniforms.model.w_axis.x < bundle.draws[4].uniforms.model.w_axis.x);
}

#[test]
fn camera_position_always_present() {
    let mut scene = sphere_grid_scene(ShaderDescriptor::ibl(false, false));
    let camera = test_camera();
    let bundle = scene.assemble(&camera).unwrap();
    assert_eq!(bundle.frame.camera_position, Vec3::new(0.0, 0.0, 8.0));
}

// ============================================================================
// Missing environment tolerance
// ============================================================================

#[test]
fn unresolved_environment_slots_are_absent() {
    let mut scene = sphere_grid_scene(ShaderDescriptor::ibl(true, true));
    // Environment present but nothing resolved yet
    scene.set_environment(Environment::new());

    let camera = test_camera();
    let bundle = scene.assemble(&camera).unwrap();

    assert!(bundle.environment.diffuse.is_none());
    assert!(bundle.environment.specular.is_none());
    assert!(bundle.environment.brdf_pre_int.is_none());
    // The pass itself is still fully assembled
    assert_eq!(bundle.draws.len(), 25);
}

#[test]
fn no_environment_at_all_still_assembles() {
    let mut scene = sphere_grid_scene(ShaderDescriptor::ibl(true, true));
    let camera = test_camera();
    assert!(scene.assemble(&camera).is_ok());
}

// ============================================================================
// Configuration mismatches
// ============================================================================

#[test]
fn light_count_mismatch_is_rejected() {
    let mut scene = sphere_grid_scene(ShaderDescriptor::lights(4));
    scene.add_light(PointLight::new(Vec3::new(0.0, 0.0, 4.0), 300.0));

    let camera = test_camera();
    match scene.assemble(&camera) {
        Err(AuraError::ConfigMismatch(msg)) => {
            assert!(msg.contains('4'), "message should name the expected count: {msg}");
        }
        other => panic!("expected ConfigMismatch, got {other:?}"),
    }
}

#[test]
fn matching_light_count_fills_the_array_in_order() {
    let mut scene = sphere_grid_scene(ShaderDescriptor::lights(4));
    for position in [
        Vec3::new(-3.0, 3.0, 4.0),
        Vec3::new(3.0, 3.0, 4.0),
        Vec3::new(3.0, -3.0, 4.0),
        Vec3::new(-3.0, -3.0, 4.0),
    ] {
        scene.add_light(PointLight::new(position, 300.0));
    }

    let camera = test_camera();
    let bundle = scene.assemble(&camera).unwrap();

    assert_eq!(bundle.frame.point_lights[0].position, Vec3::new(-3.0, 3.0, 4.0));
    assert_eq!(bundle.frame.point_lights[3].position, Vec3::new(-3.0, -3.0, 4.0));
    assert!((bundle.frame.point_lights[0].intensity - 300.0).abs() < 1e-6);
    // Slots past the compiled count stay zeroed
    assert!((bundle.frame.point_lights[4].intensity - 0.0).abs() < 1e-6);
}

// ============================================================================
// Material consumption
// ============================================================================

#[test]
fn roughness_clamped_at_assembly_not_storage() {
    let geometry = Arc::new(create_sphere(SphereOptions::default()));
    let mut scene = Scene::new(ShaderDescriptor::ibl(true, true));
    scene.add_model(Model::with_material(
        geometry,
        PbrMaterial::new(Vec3::ONE, 0.0, 0.0),
    ));

    // Storage keeps the raw value
    assert!((scene.models[0].material.roughness - 0.0).abs() < 1e-6);

    let camera = test_camera();
    let bundle = scene.assemble(&camera).unwrap();
    assert!((bundle.draws[0].uniforms.roughness - 0.04).abs() < 1e-6);
}

// ============================================================================
// Frame config
// ============================================================================

#[test]
fn albedo_override_replaces_every_material() {
    let mut scene = sphere_grid_scene(ShaderDescriptor::ibl(true, true));
    scene.config.albedo_override = Some(Vec3::new(0.2, 0.4, 0.6));

    let camera = test_camera();
    let bundle = scene.assemble(&camera).unwrap();
    for draw in &bundle.draws {
        assert_eq!(draw.uniforms.albedo, Vec3::new(0.2, 0.4, 0.6));
    }
}

#[test]
fn light_offset_shifts_every_light() {
    let mut scene = sphere_grid_scene(ShaderDescriptor::lights(1));
    scene.add_light(PointLight::new(Vec3::new(0.0, 0.0, 4.0), 300.0));
    scene.config.light_offset = Vec3::new(1.0, -2.0, 0.5);

    let camera = test_camera();
    let bundle = scene.assemble(&camera).unwrap();
    assert_eq!(
        bundle.frame.point_lights[0].position,
        Vec3::new(1.0, -2.0, 4.5)
    );
}
