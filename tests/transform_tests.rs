//! Transform and Camera tests
//!
//! Tests for:
//! - Transform TRS composition order and identity
//! - Dirty checking (recombine only touches the cache)
//! - Camera view/projection combination

use glam::{Mat4, Quat, Vec3};
use std::f32::consts::FRAC_PI_2;

use aura::scene::camera::Camera;
use aura::scene::transform::Transform;

// ============================================================================
// Helper
// ============================================================================

const EPSILON: f32 = 1e-5;

fn mat4_approx(a: Mat4, b: Mat4) -> bool {
    a.to_cols_array()
        .iter()
        .zip(b.to_cols_array().iter())
        .all(|(x, y)| (x - y).abs() < EPSILON)
}

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < EPSILON
}

// ============================================================================
// Transform Unit Tests
// ============================================================================

#[test]
fn transform_default_is_identity() {
    let mut t = Transform::new();
    assert_eq!(t.position, Vec3::ZERO);
    assert_eq!(t.rotation, Quat::IDENTITY);
    assert_eq!(t.scale, Vec3::ONE);
    assert!(mat4_approx(t.combine(), Mat4::IDENTITY));
}

#[test]
fn transform_combine_is_translate_rotate_scale() {
    let mut t = Transform::new();
    t.position = Vec3::new(1.0, -2.0, 3.0);
    t.rotation = Quat::from_rotation_y(FRAC_PI_2);
    t.scale = Vec3::new(2.0, 3.0, 4.0);

    let expected = Mat4::from_translation(t.position)
        * Mat4::from_quat(t.rotation)
        * Mat4::from_scale(t.scale);
    assert!(mat4_approx(t.combine(), expected));
}

#[test]
fn transform_combine_reflects_position() {
    let mut t = Transform::new();
    t.position = Vec3::new(10.0, 20.0, 30.0);
    t.scale = Vec3::splat(2.0);

    let mat = t.combine();
    let translation = mat.w_axis.truncate();
    assert!(vec3_approx(translation, Vec3::new(10.0, 20.0, 30.0)));
}

#[test]
fn transform_cache_stale_until_combine() {
    let mut t = Transform::new();
    t.combine();

    // Mutating the fields must not touch the cache until the next combine
    t.position = Vec3::new(5.0, 0.0, 0.0);
    assert!(mat4_approx(*t.matrix(), Mat4::IDENTITY));

    t.combine();
    assert!(vec3_approx(t.matrix().w_axis.truncate(), Vec3::new(5.0, 0.0, 0.0)));
}

#[test]
fn transform_combine_idempotent() {
    let mut t = Transform::new();
    t.position = Vec3::new(1.0, 2.0, 3.0);
    t.rotation = Quat::from_rotation_x(0.7);

    let first = t.combine();
    let second = t.combine();
    assert_eq!(first, second);
}

#[test]
fn transform_mark_dirty_forces_recombine() {
    let mut t = Transform::new();
    t.combine();
    t.mark_dirty();
    // No field changed, recombine must still produce the same matrix
    assert!(mat4_approx(t.combine(), Mat4::IDENTITY));
}

// ============================================================================
// Camera Tests
// ============================================================================

#[test]
fn camera_local_to_projection_combines_view_and_projection() {
    let mut camera = Camera::new_perspective(45.0, 16.0 / 9.0, 0.1, 100.0);
    camera.transform.position = Vec3::new(0.0, 0.0, 8.0);
    camera.update();

    let expected = camera.projection_matrix() * camera.transform.matrix().inverse();
    assert!(mat4_approx(camera.local_to_projection(), expected));
}

#[test]
fn camera_at_origin_looks_down_negative_z() {
    let mut camera = Camera::new_perspective(60.0, 1.0, 0.1, 100.0);
    camera.transform.position = Vec3::new(0.0, 0.0, 8.0);
    camera.update();

    // A point in front of the camera lands inside clip space with w > 0
    let clip = camera.local_to_projection() * Vec3::new(0.0, 0.0, 0.0).extend(1.0);
    assert!(clip.w > 0.0);
    let ndc_z = clip.z / clip.w;
    assert!((0.0..=1.0).contains(&ndc_z), "ndc z = {ndc_z}");
}

#[test]
fn camera_set_aspect_updates_projection() {
    let mut camera = Camera::new_perspective(45.0, 1.0, 0.1, 100.0);
    let before = camera.projection_matrix();
    camera.set_aspect(2.0);
    assert!(!mat4_approx(before, camera.projection_matrix()));
}
