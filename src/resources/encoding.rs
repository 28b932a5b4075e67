//! Environment-texture encodings and coordinate conventions
//!
//! Single source of truth for three conventions shared between the WGSL
//! shaders and the CPU side:
//!
//! - **RGBM**: stores wide-range color in 4 × 8-bit channels via a shared
//!   per-texel scale factor in alpha. Decode is `rgb * alpha * max_range`.
//!   [`RGBM_MAX_RANGE`] is fixed at 8.0 — changing it here requires changing
//!   every asset and shader that uses it.
//! - **Specular mip atlas**: prefiltered specular levels are stacked
//!   vertically in one texture; [`atlas_tex_coords`] is the exact layout
//!   formula the asset pipeline must match. [`MIP_LEVELS`] rungs.
//! - **Equirectangular mapping**: [`equirect_uv`] / [`equirect_direction`]
//!   convert between unit directions and environment-map UVs. The irradiance
//!   convolution writer and every sampling reader use this one mapping.
//!
//! The same functions exist in `renderer/shaders/*.wgsl`; keep both sides in
//! sync when touching any constant here.

use glam::{Vec2, Vec3};

/// Range multiplier of the RGBM encoding, shared by all writers and readers.
pub const RGBM_MAX_RANGE: f32 = 8.0;

/// Number of rungs in the vertically stacked specular mip atlas.
pub const MIP_LEVELS: f32 = 6.0;

// ============================================================================
// RGBM codec
// ============================================================================

/// Encodes linear RGB into RGBM.
///
/// The scale factor is quantized to 8-bit granularity with `ceil` so the
/// decoded value never exceeds the input (the error budget goes to
/// under-shooting, which avoids clipped highlights turning gray).
#[must_use]
pub fn rgbm_encode(color: Vec3, max_range: f32) -> [f32; 4] {
    let c = color / max_range;
    let a = c.x.max(c.y).max(c.z.max(1e-6)).clamp(0.0, 1.0);
    let a = (a * 255.0).ceil() / 255.0;
    [c.x / a, c.y / a, c.z / a, a]
}

/// Decodes RGBM back to linear RGB.
#[inline]
#[must_use]
pub fn rgbm_decode(value: [f32; 4], max_range: f32) -> Vec3 {
    Vec3::new(value[0], value[1], value[2]) * value[3] * max_range
}

/// Encodes linear RGB into RGBM bytes, as stored in an `Rgba8Unorm` texture.
#[must_use]
pub fn rgbm_encode_bytes(color: Vec3, max_range: f32) -> [u8; 4] {
    let v = rgbm_encode(color, max_range);
    [
        (v[0].clamp(0.0, 1.0) * 255.0).round() as u8,
        (v[1].clamp(0.0, 1.0) * 255.0).round() as u8,
        (v[2].clamp(0.0, 1.0) * 255.0).round() as u8,
        (v[3].clamp(0.0, 1.0) * 255.0).round() as u8,
    ]
}

/// Decodes RGBM bytes to linear RGB.
#[must_use]
pub fn rgbm_decode_bytes(value: [u8; 4], max_range: f32) -> Vec3 {
    rgbm_decode(
        [
            f32::from(value[0]) / 255.0,
            f32::from(value[1]) / 255.0,
            f32::from(value[2]) / 255.0,
            f32::from(value[3]) / 255.0,
        ],
        max_range,
    )
}

// ============================================================================
// Specular mip atlas layout
// ============================================================================

/// Maps base-level UV to the atlas coordinates of mip `level`.
///
/// Level `l` keeps full horizontal resolution scaled by `1/2^l` and lands in
/// the vertical band `[1 - 1/2^l, 1 - 1/2^(l+1)]`; level 0 fills the first
/// half of the texture, each further level half the remaining space:
///
/// ```text
/// u' = u / 2^l
/// v' = v / 2^(l+1) + 1 - 1/2^l
/// ```
#[must_use]
pub fn atlas_tex_coords(uv: Vec2, level: f32) -> Vec2 {
    let two_pow_l = 2.0_f32.powf(level);
    Vec2::new(
        uv.x / two_pow_l,
        uv.y / 2.0_f32.powf(level + 1.0) + 1.0 - 1.0 / two_pow_l,
    )
}

// ============================================================================
// Equirectangular mapping
// ============================================================================

const RECIPROCAL_PI: f32 = std::f32::consts::FRAC_1_PI;
const RECIPROCAL_PI2: f32 = 0.159_154_94;

/// Unit direction → equirectangular UV.
///
/// `v = 0` is the top image row (+Y, straight up), `v = 1` the bottom (−Y);
/// `u` wraps in longitude. Texture coordinates can be used directly without
/// any flip, on both the convolution writer and every sampling reader.
#[must_use]
pub fn equirect_uv(n: Vec3) -> Vec2 {
    Vec2::new(
        n.z.atan2(n.x) * RECIPROCAL_PI2 + 0.5,
        0.5 - n.y.clamp(-1.0, 1.0).asin() * RECIPROCAL_PI,
    )
}

/// Equirectangular UV → unit direction. Inverse of [`equirect_uv`].
#[must_use]
pub fn equirect_direction(uv: Vec2) -> Vec3 {
    let lon = (uv.x - 0.5) * std::f32::consts::TAU;
    let lat = (0.5 - uv.y) * std::f32::consts::PI;
    Vec3::new(lat.cos() * lon.cos(), lat.sin(), lat.cos() * lon.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_white() {
        // (1,1,1) at range 8: a = ceil(255/8)/255 = 32/255
        let v = rgbm_encode(Vec3::ONE, RGBM_MAX_RANGE);
        assert!((v[3] - 32.0 / 255.0).abs() < 1e-6);
        let back = rgbm_decode(v, RGBM_MAX_RANGE);
        assert!((back - Vec3::ONE).length() < 1e-3);
    }

    #[test]
    fn test_equirect_roundtrip() {
        for dir in [
            Vec3::X,
            Vec3::Z,
            Vec3::NEG_X,
            Vec3::new(0.5, 0.5, -0.7).normalize(),
        ] {
            let uv = equirect_uv(dir);
            let back = equirect_direction(uv);
            assert!(
                (back - dir).length() < 1e-4,
                "roundtrip failed for {dir:?}: {back:?}"
            );
        }
    }

    #[test]
    fn test_atlas_base_level() {
        // Level 0: horizontal identity, vertical into the first band
        let uv = Vec2::new(0.3, 0.8);
        let mapped = atlas_tex_coords(uv, 0.0);
        assert!((mapped.x - 0.3).abs() < 1e-6);
        assert!((mapped.y - 0.4).abs() < 1e-6);
    }
}
