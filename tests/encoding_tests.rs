//! Encoding contract tests
//!
//! Tests for:
//! - RGBM round-trip within 8-bit quantization error
//! - Specular mip-atlas coordinate mapping (band containment)
//! - Equirectangular direction mapping round-trips

use glam::{Vec2, Vec3};

use aura::resources::encoding::{
    MIP_LEVELS, RGBM_MAX_RANGE, atlas_tex_coords, equirect_direction, equirect_uv,
    rgbm_decode_bytes, rgbm_encode_bytes,
};

// ============================================================================
// RGBM round-trip
// ============================================================================

#[test]
fn rgbm_roundtrip_within_quantization_error() {
    // One 8-bit step of the shared scale factor per channel
    let tolerance = RGBM_MAX_RANGE / 255.0;

    let samples = [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(0.5, 0.25, 0.125),
        Vec3::new(8.0, 8.0, 8.0),
        Vec3::new(7.3, 0.02, 3.999),
        Vec3::new(0.001, 0.001, 0.001),
    ];

    for rgb in samples {
        let encoded = rgbm_encode_bytes(rgb, RGBM_MAX_RANGE);
        let decoded = rgbm_decode_bytes(encoded, RGBM_MAX_RANGE);
        for c in 0..3 {
            assert!(
                (decoded[c] - rgb[c]).abs() <= tolerance,
                "channel {c} of {rgb:?} decoded to {decoded:?}"
            );
        }
    }
}

#[test]
fn rgbm_roundtrip_dense_grid() {
    let tolerance = RGBM_MAX_RANGE / 255.0;
    let mut v = 0.0f32;
    while v <= RGBM_MAX_RANGE {
        let rgb = Vec3::new(v, v * 0.5, RGBM_MAX_RANGE - v);
        let decoded = rgbm_decode_bytes(rgbm_encode_bytes(rgb, RGBM_MAX_RANGE), RGBM_MAX_RANGE);
        assert!((decoded - rgb).abs().max_element() <= tolerance, "{rgb:?} -> {decoded:?}");
        v += 0.37;
    }
}

// ============================================================================
// Specular mip-atlas layout
// ============================================================================

#[test]
fn atlas_base_level_keeps_horizontal_identity() {
    for x in [0.0f32, 0.25, 0.5, 0.99, 1.0] {
        let mapped = atlas_tex_coords(Vec2::new(x, 0.5), 0.0);
        assert!((mapped.x - x).abs() < 1e-6);
    }
}

#[test]
fn atlas_levels_stay_inside_their_vertical_band() {
    for level in 0..(MIP_LEVELS as u32) {
        let l = level as f32;
        let band_top = 1.0 - 1.0 / 2.0f32.powf(l);
        let band_bottom = 1.0 - 1.0 / 2.0f32.powf(l + 1.0);

        for u in [0.0f32, 0.33, 0.66, 1.0] {
            for v in [0.0f32, 0.5, 1.0] {
                let mapped = atlas_tex_coords(Vec2::new(u, v), l);
                assert!(
                    mapped.y >= band_top - 1e-6 && mapped.y <= band_bottom + 1e-6,
                    "level {level} uv ({u},{v}) mapped to y={} outside [{band_top},{band_bottom}]",
                    mapped.y
                );
            }
        }
    }
}

#[test]
fn atlas_levels_do_not_overlap() {
    // The bottom of each band is the top of the next
    let uv = Vec2::new(0.5, 1.0);
    for level in 0..(MIP_LEVELS as u32 - 1) {
        let this_bottom = atlas_tex_coords(uv, level as f32).y;
        let next_top = atlas_tex_coords(Vec2::new(0.5, 0.0), (level + 1) as f32).y;
        assert!((this_bottom - next_top).abs() < 1e-6);
    }
}

// ============================================================================
// Equirectangular mapping
// ============================================================================

#[test]
fn equirect_roundtrip_over_the_sphere() {
    for lat_step in 1..8 {
        for lon_step in 0..16 {
            let lat = (lat_step as f32 / 8.0 - 0.5) * std::f32::consts::PI * 0.98;
            let lon = lon_step as f32 / 16.0 * std::f32::consts::TAU;
            let dir = Vec3::new(
                lat.cos() * lon.cos(),
                lat.sin(),
                lat.cos() * lon.sin(),
            );
            let back = equirect_direction(equirect_uv(dir));
            assert!(
                (back - dir).length() < 1e-4,
                "dir {dir:?} round-tripped to {back:?}"
            );
        }
    }
}

#[test]
fn equirect_up_maps_to_top_row() {
    let uv = equirect_uv(Vec3::Y);
    assert!(uv.y.abs() < 1e-6, "up should map to v=0, got {}", uv.y);

    let uv = equirect_uv(Vec3::NEG_Y);
    assert!((uv.y - 1.0).abs() < 1e-6, "down should map to v=1, got {}", uv.y);
}
