//! Irradiance convolution tests (CPU reference path)
//!
//! Tests for:
//! - Energy sanity: a flat environment convolves to a flat, proportional
//!   irradiance map
//! - Output encoding round-trips through the shared RGBM convention
//! - Invalid inputs rejected instead of silently producing garbage

use glam::Vec3;

use aura::renderer::irradiance::{ConvolutionSettings, convolve_image};
use aura::resources::Image;
use aura::resources::encoding::{RGBM_MAX_RANGE, rgbm_decode_bytes, rgbm_encode_bytes};

// ============================================================================
// Helpers
// ============================================================================

fn flat_rgbm_image(width: u32, height: u32, color: Vec3) -> Image {
    let texel = rgbm_encode_bytes(color, RGBM_MAX_RANGE);
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for _ in 0..width * height {
        data.extend_from_slice(&texel);
    }
    Image::new(
        "flat-env",
        width,
        height,
        wgpu::TextureFormat::Rgba8Unorm,
        Some(data),
    )
}

fn decode_texels(image: &Image) -> Vec<Vec3> {
    image
        .with_data(|data| {
            data.chunks_exact(4)
                .map(|px| rgbm_decode_bytes([px[0], px[1], px[2], px[3]], RGBM_MAX_RANGE))
                .collect()
        })
        .unwrap()
}

// ============================================================================
// Energy sanity
// ============================================================================

#[test]
fn flat_white_environment_convolves_uniformly() {
    let input = flat_rgbm_image(4, 4, Vec3::ONE);
    let settings = ConvolutionSettings::default();

    let output = convolve_image(&input, &settings).unwrap();
    assert_eq!(output.width(), 4);
    assert_eq!(output.height(), 4);

    let texels = decode_texels(&output);

    // Every output texel decodes to the same value within 5%
    let reference = texels[0];
    assert!(reference.x > 0.0);
    for (i, texel) in texels.iter().enumerate() {
        let deviation = (*texel - reference).abs().max_element() / reference.x;
        assert!(deviation < 0.05, "texel {i} deviates by {deviation}: {texel:?}");
    }

    // Proportional to the input: PI * mean(cos*cos) over the sampled
    // hemisphere patch works out to 4/PI for a unit-radiance environment
    let expected = 4.0 / std::f32::consts::PI;
    for texel in &texels {
        assert!(
            (texel.x - expected).abs() / expected < 0.05,
            "expected ~{expected}, got {texel:?}"
        );
    }
}

#[test]
fn flat_gray_environment_scales_linearly() {
    let settings = ConvolutionSettings::default();

    let white = decode_texels(&convolve_image(&flat_rgbm_image(4, 4, Vec3::ONE), &settings).unwrap());
    let gray =
        decode_texels(&convolve_image(&flat_rgbm_image(4, 4, Vec3::splat(0.5)), &settings).unwrap());

    for (w, g) in white.iter().zip(gray.iter()) {
        // Halving the environment halves the irradiance (within quantization)
        assert!((g.x * 2.0 - w.x).abs() < 0.1, "white {w:?} vs gray {g:?}");
    }
}

#[test]
fn hemisphere_weighting_favors_the_lit_half() {
    // Top half bright, bottom half black
    let width = 8;
    let height = 8;
    let bright = rgbm_encode_bytes(Vec3::ONE, RGBM_MAX_RANGE);
    let dark = rgbm_encode_bytes(Vec3::ZERO, RGBM_MAX_RANGE);
    let mut data = Vec::new();
    for y in 0..height {
        for _ in 0..width {
            data.extend_from_slice(if y < height / 2 { &bright } else { &dark });
        }
    }
    let input = Image::new(
        "split-env",
        width,
        height,
        wgpu::TextureFormat::Rgba8Unorm,
        Some(data),
    );

    let output = convolve_image(&input, &ConvolutionSettings::default()).unwrap();
    let texels = decode_texels(&output);

    // Texel looking straight up (top row) must receive more energy than one
    // looking straight down
    let top = texels[(width / 2) as usize];
    let bottom = texels[((height - 1) * width + width / 2) as usize];
    assert!(
        top.x > bottom.x,
        "top {top:?} should out-collect bottom {bottom:?}"
    );
    // And everything stays within the representable range
    for texel in &texels {
        assert!(texel.max_element() <= RGBM_MAX_RANGE + 1e-3);
    }
}

#[test]
fn coarser_step_stays_within_discretization_tolerance() {
    let input = flat_rgbm_image(4, 4, Vec3::ONE);

    let fine = ConvolutionSettings {
        sample_step: 0.01,
        ..Default::default()
    };
    let coarse = ConvolutionSettings {
        sample_step: 0.05,
        ..Default::default()
    };

    let fine_texels = decode_texels(&convolve_image(&input, &fine).unwrap());
    let coarse_texels = decode_texels(&convolve_image(&input, &coarse).unwrap());

    for (f, c) in fine_texels.iter().zip(coarse_texels.iter()) {
        assert!((f.x - c.x).abs() / f.x < 0.05, "fine {f:?} vs coarse {c:?}");
    }
}

// ============================================================================
// Input validation
// ============================================================================

#[test]
fn missing_pixel_data_is_rejected() {
    let input = Image::new("empty", 4, 4, wgpu::TextureFormat::Rgba8Unorm, None);
    assert!(convolve_image(&input, &ConvolutionSettings::default()).is_err());
}

#[test]
fn wrong_format_is_rejected() {
    let input = Image::new(
        "srgb",
        2,
        2,
        wgpu::TextureFormat::Rgba8UnormSrgb,
        Some(vec![0; 16]),
    );
    assert!(convolve_image(&input, &ConvolutionSettings::default()).is_err());
}
