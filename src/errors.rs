//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! The main error type [`GlintError`] covers every failure mode of the core:
//! - Device and surface initialization failures
//! - Resource sequencing mistakes (binding or drawing before allocation)
//! - Shader compilation and program linking failures
//! - Attribute and uniform lookup failures
//!
//! None of these are retried. They signal a programming error or an
//! unusable device, and are surfaced to the caller immediately.
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for `std::result::Result<T, GlintError>`.
//!
//! ```rust,ignore
//! use glint::errors::{GlintError, Result};
//!
//! fn build() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::renderer::device::ShaderStage;

/// The main error type for the Glint engine.
#[derive(Error, Debug)]
pub enum GlintError {
    // ========================================================================
    // Initialization Errors
    // ========================================================================
    /// Failed to request a compatible GPU adapter.
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// Failed to create the GPU device.
    #[error("Failed to create WGPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    /// Failed to create a presentation surface for the window.
    #[error("Failed to create surface: {0}")]
    SurfaceCreateFailed(#[from] wgpu::CreateSurfaceError),

    /// The adapter cannot present to the surface.
    #[error("Surface not supported by adapter")]
    SurfaceUnsupported,

    /// Window system error.
    #[error("Window system error: {0}")]
    WindowError(#[from] raw_window_handle::HandleError),

    /// Event loop error (winit).
    #[cfg(feature = "winit")]
    #[error("Event loop error: {0}")]
    EventLoopError(#[from] winit::error::EventLoopError),

    // ========================================================================
    // Resource Sequencing Errors
    // ========================================================================
    /// A vertex attribute or index upload was attempted with no vertex layout bound.
    #[error("No active vertex layout: call create_vao/begin before uploading `{0}`")]
    NoActiveLayout(String),

    /// `bind`/`draw` on a buffer whose vertex layout was never created.
    #[error("Vertex layout has not been created")]
    LayoutNotCreated,

    /// `draw` on a geometry that was never uploaded.
    #[error("Geometry must be uploaded before it is drawn")]
    GeometryNotUploaded,

    /// `upload` on a geometry that already owns GPU buffers.
    #[error("Geometry is already uploaded")]
    GeometryAlreadyUploaded,

    /// A device object handle is stale or of the wrong kind.
    #[error("Invalid {kind} handle")]
    InvalidHandle {
        /// Object kind ("buffer", "shader", ...)
        kind: &'static str,
    },

    /// Vertex or index data does not match its declared layout.
    #[error("Invalid vertex data: {0}")]
    InvalidVertexData(String),

    /// Program used after `dispose`, or material used before compilation.
    #[error("Shader program is not available (disposed or never compiled)")]
    ProgramUnavailable,

    /// A draw or uniform upload was issued with no program in use.
    #[error("No shader program in use")]
    NoActiveProgram,

    // ========================================================================
    // Shader Errors
    // ========================================================================
    /// Shader compilation failed; carries the compiler log verbatim.
    #[error("{stage:?} shader compilation failed: {log}")]
    ShaderCompilation {
        /// Stage of the failing shader
        stage: ShaderStage,
        /// Compiler diagnostic
        log: String,
    },

    /// Program linking failed; carries the linker log verbatim.
    #[error("Shader program linking failed: {log}")]
    ProgramLink {
        /// Linker diagnostic
        log: String,
    },

    // ========================================================================
    // Lookup Errors
    // ========================================================================
    /// Attribute name absent from the linked program.
    #[error("Attribute `{0}` not found in program")]
    AttributeNotFound(String),

    /// Uniform name absent from the linked program.
    #[error("Uniform `{0}` not found in program")]
    UniformNotFound(String),

    /// Uniform value does not match the declared uniform type.
    #[error("Uniform `{name}` expects {expected}, got {actual}")]
    UniformTypeMismatch {
        /// Uniform name
        name: String,
        /// Declared type
        expected: &'static str,
        /// Supplied type
        actual: &'static str,
    },

    // ========================================================================
    // Camera Errors
    // ========================================================================
    /// Camera position coincides with its target; no view direction exists.
    #[error("Camera position and target coincide at {0}")]
    DegenerateCamera(glam::Vec3),

    // ========================================================================
    // Frame Errors
    // ========================================================================
    /// Unrecoverable surface acquisition failure.
    #[error("Surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    /// The GPU device rejected the shader modules or pipeline built for a draw.
    #[error("Pipeline creation failed: {0}")]
    PipelineCreation(String),
}

/// Alias for `Result<T, GlintError>`.
pub type Result<T> = std::result::Result<T, GlintError>;
