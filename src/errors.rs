//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! The main error type [`AuraError`] covers all failure modes including:
//! - GPU initialization failures
//! - Shader generation and compilation errors
//! - Resource upload and validation errors
//! - Asset loading and decoding errors
//!
//! All public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, AuraError>`.

use thiserror::Error;

/// The main error type for the Aura engine.
///
/// Setup-time failures (adapter, shader, framebuffer) are fatal for the
/// affected resource and abort that resource's initialization; load-time
/// failures (texture decode) are recoverable and surface as an absent slot
/// instead (see [`crate::assets::AsyncTexture`]).
#[derive(Error, Debug)]
pub enum AuraError {
    // ========================================================================
    // GPU & Rendering Errors
    // ========================================================================
    /// Failed to request a compatible GPU adapter.
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// Failed to create the GPU device.
    #[error("Failed to create WGPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    /// Window system error.
    #[error("Window system error: {0}")]
    WindowError(#[from] raw_window_handle::HandleError),

    /// Failed to acquire the next surface frame.
    #[error("Surface error: {0}")]
    SurfaceError(#[from] wgpu::SurfaceError),

    // ========================================================================
    // Shader Errors
    // ========================================================================
    /// Shader template rendering or WGSL compilation failure.
    ///
    /// `stage` identifies the failing step (template, vertex, fragment);
    /// `log` carries the compiler/template diagnostic verbatim.
    #[error("Shader compilation failed at {stage}: {log}")]
    ShaderCompile {
        /// Which stage failed (template rendering, vertex, fragment)
        stage: &'static str,
        /// The compiler or template-engine diagnostic
        log: String,
    },

    /// A draw was requested with a shader that never compiled.
    #[error("Shader program not compiled: {0}")]
    ProgramNotCompiled(String),

    // ========================================================================
    // Resource Errors
    // ========================================================================
    /// Geometry failed upload validation (attribute/index layout).
    #[error("Invalid geometry '{name}': {reason}")]
    InvalidGeometry {
        /// The geometry label
        name: String,
        /// Why validation rejected it
        reason: String,
    },

    /// A draw referenced a resource that was never uploaded.
    #[error("Resource not uploaded: {0}")]
    ResourceNotUploaded(String),

    /// Scene state does not match the compiled shader specialization.
    #[error("Configuration mismatch: {0}")]
    ConfigMismatch(String),

    // ========================================================================
    // Convolution Errors
    // ========================================================================
    /// The irradiance pass failed validation or readback.
    ///
    /// Unlike a silently-skipped readback, an incomplete render target here
    /// aborts the whole convolution with a diagnostic.
    #[error("Irradiance convolution failed: {0}")]
    Convolution(String),

    // ========================================================================
    // Asset & I/O Errors
    // ========================================================================
    /// Image decoding error.
    #[error("Image decode error: {0}")]
    ImageDecodeError(String),

    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<image::ImageError> for AuraError {
    fn from(err: image::ImageError) -> Self {
        AuraError::ImageDecodeError(err.to_string())
    }
}

/// Alias for `Result<T, AuraError>`.
pub type Result<T> = std::result::Result<T, AuraError>;
