//! Deferred rendering pipeline
//!
//! Executes the per-frame pass sequence (geometry, light accumulation,
//! composite, post-process, present) against off-screen targets. The module
//! owns no GPU objects itself; everything goes through the
//! [`GraphicsDevice`] and [`PresentTarget`] capability traits supplied by a
//! backend.

pub mod api;
pub mod deferred;
pub mod lighting;
pub mod post;
pub mod targets;
pub mod technique;

pub use api::{
    BlendMode, BufferHandle, ClearValue, DrawBatch, GraphicsDevice, PresentTarget, TargetDesc,
    TargetFormat, TargetHandle, TechniqueDesc, TechniqueHandle, TextureDesc, TextureHandle,
};
pub use deferred::{DeferredPipeline, PipelineStage, RenderStats};
pub use lighting::{GpuLight, Light, LightType, LightingEnvironment};
pub use post::PostEffect;
pub use targets::RenderTargetChain;
pub use technique::{TechniqueId, TechniqueRegistry};

use thiserror::Error;

/// Errors reported by rendering operations
///
/// Everything except [`RenderError::DeviceLost`] is recoverable: the affected
/// pass or entry falls back to a no-op and the frame completes. Device loss
/// is surfaced to the owning application, which is responsible for full
/// pipeline reinitialization.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// GPU resource creation failed
    #[error("resource creation failed: {0}")]
    ResourceCreation(String),

    /// Technique/shader compilation failed
    #[error("technique compilation failed: {0}")]
    TechniqueCompile(String),

    /// A draw submission was rejected by the backend
    #[error("draw submission failed: {0}")]
    DrawFailed(String),

    /// Presenting the final target failed
    #[error("present failed: {0}")]
    PresentFailed(String),

    /// The graphics device/context was lost; fatal for this pipeline instance
    #[error("graphics device lost")]
    DeviceLost,
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
