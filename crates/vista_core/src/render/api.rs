//! Backend capability traits for the rendering core
//!
//! The core consumes graphics resources through these traits and never talks
//! to a graphics API directly. Handles are opaque tokens minted by the
//! backend; the core only stores and passes them back.

use crate::foundation::math::Mat4;
use crate::render::RenderError;

/// Handle to a texture resource stored in the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Handle to an off-screen render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetHandle(pub u64);

/// Handle to a compiled technique (shader program plus fixed state)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TechniqueHandle(pub u64);

/// Handle to a vertex buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// Pixel format of a render target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    /// Depth + stencil attachment
    DepthStencil,
    /// 8-bit RGBA color
    Rgba8,
    /// 16-bit float RGBA color (HDR accumulation)
    Rgba16F,
    /// Single 8-bit channel
    R8,
}

/// Description of a render target to create
#[derive(Debug, Clone)]
pub struct TargetDesc {
    /// Debug label passed through to the backend
    pub label: &'static str,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel format
    pub format: TargetFormat,
}

/// Description of a texture to create from CPU-side pixels
#[derive(Debug, Clone)]
pub struct TextureDesc<'a> {
    /// Debug label passed through to the backend
    pub label: &'static str,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Tightly packed RGBA8 pixel data
    pub pixels: &'a [u8],
}

/// Description of a technique to compile
///
/// Shader source lives with the backend's asset pipeline; the core refers to
/// techniques by name only.
#[derive(Debug, Clone)]
pub struct TechniqueDesc {
    /// Technique name resolved by the backend
    pub name: String,
    /// Fixed-function blend state
    pub blend: BlendMode,
    /// Whether depth testing is enabled
    pub depth_test: bool,
}

/// Fixed-function blend state of a draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// No blending
    Opaque,
    /// Standard alpha blending
    Alpha,
    /// Additive accumulation
    Additive,
}

/// Clear values applied to targets at the start of a pass
#[derive(Debug, Clone, Copy)]
pub struct ClearValue {
    /// Color written to color targets
    pub color: [f32; 4],
    /// Depth written to depth targets
    pub depth: f32,
}

impl ClearValue {
    /// Transparent black color, far depth
    pub const BLACK: ClearValue = ClearValue {
        color: [0.0, 0.0, 0.0, 0.0],
        depth: 1.0,
    };
}

/// One batched draw submission
///
/// An empty `instances` slice draws a single full-screen quad; a non-empty
/// slice draws the batch geometry once per instance transform.
#[derive(Debug)]
pub struct DrawBatch<'a> {
    /// Technique to draw with
    pub technique: TechniqueHandle,
    /// Color attachments written by the draw
    pub color_targets: &'a [TargetHandle],
    /// Optional depth attachment
    pub depth_target: Option<TargetHandle>,
    /// Targets sampled as inputs
    pub inputs: &'a [TargetHandle],
    /// Per-instance world transforms
    pub instances: &'a [Mat4],
    /// Raw uniform block bytes for the technique
    pub uniforms: &'a [u8],
    /// Blend state override for this batch
    pub blend: BlendMode,
}

/// Graphics-resource provider capability
///
/// Implemented by the graphics backend. All methods are called from the
/// frame-loop thread only.
pub trait GraphicsDevice {
    /// Create an immutable texture from CPU pixels
    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle, RenderError>;

    /// Create an off-screen render target
    fn create_render_target(&mut self, desc: &TargetDesc) -> Result<TargetHandle, RenderError>;

    /// Destroy a render target previously created by this device
    fn destroy_render_target(&mut self, target: TargetHandle);

    /// Compile a technique by name
    fn compile_technique(&mut self, desc: &TechniqueDesc) -> Result<TechniqueHandle, RenderError>;

    /// Create a static vertex buffer
    fn create_vertex_buffer(&mut self, data: &[u8]) -> Result<BufferHandle, RenderError>;

    /// Clear a target to fixed values
    fn clear_target(&mut self, target: TargetHandle, clear: &ClearValue) -> Result<(), RenderError>;

    /// Submit one batched draw
    fn draw(&mut self, batch: &DrawBatch) -> Result<(), RenderError>;
}

/// Windowing/presentation capability
pub trait PresentTarget {
    /// Current size of the output surface in pixels
    fn viewport_size(&self) -> (u32, u32);

    /// Hand the final composited target to the windowing system
    fn present(&mut self, target: TargetHandle) -> Result<(), RenderError>;
}
