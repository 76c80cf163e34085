//! Post-process effect chain
//!
//! Effects run in order after the composite stage, each reading the previous
//! stage's output target and writing the next. A disabled effect is skipped;
//! a failing effect is skipped for the frame and its input passes through
//! unchanged, so the chain degrades to a direct copy when nothing runs.

pub mod bloom;
pub mod ssao;

pub use bloom::{BloomConfig, BloomEffect};
pub use ssao::{SsaoConfig, SsaoEffect};

use crate::render::{GraphicsDevice, RenderError, RenderTargetChain, TargetHandle};

/// One stage of the post-process chain
pub trait PostEffect {
    /// Stable name used for logging and configuration lookups
    fn name(&self) -> &str;

    /// Whether the effect should run this frame
    fn enabled(&self) -> bool;

    /// Enable or disable the effect
    fn set_enabled(&mut self, enabled: bool);

    /// Rebuild resolution-dependent resources after a resize
    ///
    /// Effects that keep no sized resources can rely on the default no-op.
    fn resize(
        &mut self,
        _device: &mut dyn GraphicsDevice,
        _extent: (u32, u32),
    ) -> Result<(), RenderError> {
        Ok(())
    }

    /// Run the effect, reading `input` and writing `output`
    ///
    /// `chain` exposes the geometry buffer for effects that sample depth or
    /// normals. On error the pipeline drops this effect's output for the
    /// frame and hands `input` to the next stage.
    fn execute(
        &mut self,
        device: &mut dyn GraphicsDevice,
        input: TargetHandle,
        output: TargetHandle,
        chain: &RenderTargetChain,
    ) -> Result<(), RenderError>;
}
