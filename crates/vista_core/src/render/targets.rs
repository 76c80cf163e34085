//! Off-screen render target chain owned by the deferred pipeline

use crate::render::{GraphicsDevice, RenderError, TargetDesc, TargetFormat, TargetHandle};

/// The deferred pipeline's off-screen buffers
///
/// Geometry buffer (depth/normal/albedo), light accumulation, and the two
/// post-process ping-pong targets. Persistent across frames; recreated as a
/// unit when the output resolution changes.
#[derive(Debug, Clone, Copy)]
pub struct RenderTargetChain {
    extent: (u32, u32),
    /// Geometry depth/stencil buffer
    pub depth: TargetHandle,
    /// World-space normals
    pub normal: TargetHandle,
    /// Albedo and material parameters
    pub albedo: TargetHandle,
    /// HDR light accumulation
    pub light_accum: TargetHandle,
    /// First post-process ping-pong target (composite output)
    pub post_a: TargetHandle,
    /// Second post-process ping-pong target
    pub post_b: TargetHandle,
}

const TARGET_SPECS: [(&str, TargetFormat); 6] = [
    ("gbuffer.depth", TargetFormat::DepthStencil),
    ("gbuffer.normal", TargetFormat::Rgba16F),
    ("gbuffer.albedo", TargetFormat::Rgba8),
    ("light.accum", TargetFormat::Rgba16F),
    ("post.ping", TargetFormat::Rgba16F),
    ("post.pong", TargetFormat::Rgba16F),
];

impl RenderTargetChain {
    /// Create the full chain at the given resolution
    pub fn create(
        device: &mut dyn GraphicsDevice,
        extent: (u32, u32),
    ) -> Result<Self, RenderError> {
        let mut created: Vec<TargetHandle> = Vec::with_capacity(TARGET_SPECS.len());

        for (label, format) in TARGET_SPECS {
            let desc = TargetDesc {
                label,
                width: extent.0,
                height: extent.1,
                format,
            };
            match device.create_render_target(&desc) {
                Ok(handle) => created.push(handle),
                Err(e) => {
                    // Partial chains are useless; release what exists
                    for handle in created {
                        device.destroy_render_target(handle);
                    }
                    return Err(e);
                }
            }
        }

        Ok(Self {
            extent,
            depth: created[0],
            normal: created[1],
            albedo: created[2],
            light_accum: created[3],
            post_a: created[4],
            post_b: created[5],
        })
    }

    /// Current resolution of every target in the chain
    pub fn extent(&self) -> (u32, u32) {
        self.extent
    }

    /// All handles in the chain
    pub fn all(&self) -> [TargetHandle; 6] {
        [
            self.depth,
            self.normal,
            self.albedo,
            self.light_accum,
            self.post_a,
            self.post_b,
        ]
    }

    /// Release every target in the chain
    pub fn destroy(&self, device: &mut dyn GraphicsDevice) {
        for handle in self.all() {
            device.destroy_render_target(handle);
        }
    }

    /// Recreate the whole chain at a new resolution
    ///
    /// The new chain is created before the old one is released, so on failure
    /// the existing chain stays intact and usable.
    pub fn recreate(
        &mut self,
        device: &mut dyn GraphicsDevice,
        extent: (u32, u32),
    ) -> Result<(), RenderError> {
        let fresh = Self::create(device, extent)?;
        self.destroy(device);
        *self = fresh;
        Ok(())
    }
}
