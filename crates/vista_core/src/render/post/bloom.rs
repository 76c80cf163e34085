//! Bloom/glow effect
//!
//! Extracts pixels above a brightness threshold into a half-resolution
//! scratch target, blurs them over several passes, and adds the result back
//! onto the composited image.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::render::post::PostEffect;
use crate::render::{
    BlendMode, DrawBatch, GraphicsDevice, RenderError, RenderTargetChain, TargetDesc,
    TargetFormat, TargetHandle, TechniqueDesc, TechniqueHandle,
};

/// Configuration for the bloom effect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BloomConfig {
    /// Brightness threshold for bloom extraction
    pub threshold: f32,

    /// Bloom intensity added back to the image (0.0 - 2.0)
    pub intensity: f32,

    /// Number of blur passes
    pub blur_passes: u32,

    /// Knee for the soft threshold (0.0 - 1.0)
    pub knee: f32,

    /// Whether bloom is enabled
    pub enabled: bool,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            intensity: 0.5,
            blur_passes: 5,
            knee: 0.5,
            enabled: true,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct GpuBloomParams {
    /// Meaning varies per pass; see the pass bodies
    params: [f32; 4],
}

/// Bloom post-process effect
pub struct BloomEffect {
    config: BloomConfig,
    threshold_tech: Option<TechniqueHandle>,
    blur_tech: Option<TechniqueHandle>,
    combine_tech: Option<TechniqueHandle>,
    /// Half-resolution blur scratch targets
    work: Option<[TargetHandle; 2]>,
    work_extent: (u32, u32),
}

impl BloomEffect {
    /// Create the effect from configuration
    pub fn new(config: BloomConfig) -> Self {
        Self {
            config,
            threshold_tech: None,
            blur_tech: None,
            combine_tech: None,
            work: None,
            work_extent: (0, 0),
        }
    }

    /// Current configuration
    pub fn config(&self) -> &BloomConfig {
        &self.config
    }

    fn technique(
        device: &mut dyn GraphicsDevice,
        slot: &mut Option<TechniqueHandle>,
        name: &str,
    ) -> Result<TechniqueHandle, RenderError> {
        if let Some(handle) = *slot {
            return Ok(handle);
        }
        let handle = device.compile_technique(&TechniqueDesc {
            name: name.to_string(),
            blend: BlendMode::Opaque,
            depth_test: false,
        })?;
        *slot = Some(handle);
        Ok(handle)
    }

    fn ensure_work_targets(
        &mut self,
        device: &mut dyn GraphicsDevice,
        extent: (u32, u32),
    ) -> Result<[TargetHandle; 2], RenderError> {
        let half = (extent.0.max(2) / 2, extent.1.max(2) / 2);
        if let Some(work) = self.work {
            if self.work_extent == half {
                return Ok(work);
            }
            for handle in work {
                device.destroy_render_target(handle);
            }
            self.work = None;
        }

        let a = device.create_render_target(&TargetDesc {
            label: "bloom.work_a",
            width: half.0,
            height: half.1,
            format: TargetFormat::Rgba16F,
        })?;
        let b = match device.create_render_target(&TargetDesc {
            label: "bloom.work_b",
            width: half.0,
            height: half.1,
            format: TargetFormat::Rgba16F,
        }) {
            Ok(b) => b,
            Err(e) => {
                device.destroy_render_target(a);
                return Err(e);
            }
        };

        self.work = Some([a, b]);
        self.work_extent = half;
        Ok([a, b])
    }
}

impl PostEffect for BloomEffect {
    fn name(&self) -> &str {
        "bloom"
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    fn resize(
        &mut self,
        device: &mut dyn GraphicsDevice,
        _extent: (u32, u32),
    ) -> Result<(), RenderError> {
        // Scratch targets are sized from the chain; drop them and let the
        // next execute rebuild at the new resolution.
        if let Some(work) = self.work.take() {
            for handle in work {
                device.destroy_render_target(handle);
            }
        }
        self.work_extent = (0, 0);
        Ok(())
    }

    fn execute(
        &mut self,
        device: &mut dyn GraphicsDevice,
        input: TargetHandle,
        output: TargetHandle,
        chain: &RenderTargetChain,
    ) -> Result<(), RenderError> {
        let threshold = Self::technique(device, &mut self.threshold_tech, "post.bloom.threshold")?;
        let blur = Self::technique(device, &mut self.blur_tech, "post.bloom.blur")?;
        let combine = Self::technique(device, &mut self.combine_tech, "post.bloom.combine")?;
        let [work_a, work_b] = self.ensure_work_targets(device, chain.extent())?;

        // Extract bright pixels into the half-res scratch target
        let params = GpuBloomParams {
            params: [self.config.threshold, self.config.knee, 0.0, 0.0],
        };
        device.draw(&DrawBatch {
            technique: threshold,
            color_targets: &[work_a],
            depth_target: None,
            inputs: &[input],
            instances: &[],
            uniforms: bytemuck::bytes_of(&params),
            blend: BlendMode::Opaque,
        })?;

        // Separable blur, alternating between the scratch targets
        let mut source = work_a;
        let mut dest = work_b;
        for pass in 0..self.config.blur_passes {
            let horizontal = if pass % 2 == 0 { 1.0 } else { 0.0 };
            let params = GpuBloomParams {
                params: [
                    horizontal,
                    1.0 / self.work_extent.0 as f32,
                    1.0 / self.work_extent.1 as f32,
                    0.0,
                ],
            };
            device.draw(&DrawBatch {
                technique: blur,
                color_targets: &[dest],
                depth_target: None,
                inputs: &[source],
                instances: &[],
                uniforms: bytemuck::bytes_of(&params),
                blend: BlendMode::Opaque,
            })?;
            std::mem::swap(&mut source, &mut dest);
        }

        // Add the blurred highlights back onto the image
        let params = GpuBloomParams {
            params: [self.config.intensity, 0.0, 0.0, 0.0],
        };
        device.draw(&DrawBatch {
            technique: combine,
            color_targets: &[output],
            depth_target: None,
            inputs: &[input, source],
            instances: &[],
            uniforms: bytemuck::bytes_of(&params),
            blend: BlendMode::Opaque,
        })
    }
}
