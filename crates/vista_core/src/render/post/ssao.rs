//! Screen-space ambient occlusion
//!
//! Samples the geometry buffer's depth and normal targets in a hemisphere
//! around each pixel and darkens creases and contact regions of the
//! composited image.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::render::post::PostEffect;
use crate::render::{
    BlendMode, DrawBatch, GraphicsDevice, RenderError, RenderTargetChain, TargetHandle,
    TechniqueDesc, TechniqueHandle, TextureDesc, TextureHandle,
};

/// Configuration for the SSAO effect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SsaoConfig {
    /// Occlusion radius in world units
    pub radius: f32,

    /// Occlusion intensity (0.0 - 2.0)
    pub intensity: f32,

    /// Bias to prevent self-occlusion
    pub bias: f32,

    /// Number of samples per pixel
    pub sample_count: u32,

    /// Power curve for occlusion falloff
    pub power: f32,

    /// Whether SSAO is enabled
    pub enabled: bool,
}

impl Default for SsaoConfig {
    fn default() -> Self {
        Self {
            radius: 0.5,
            intensity: 1.0,
            bias: 0.025,
            sample_count: 32,
            power: 2.0,
            enabled: true,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct GpuSsaoParams {
    /// x radius, y intensity, z bias, w power
    shape: [f32; 4],
    /// x sample count
    samples: [f32; 4],
}

const NOISE_SIZE: u32 = 4;

/// Screen-space ambient occlusion effect
pub struct SsaoEffect {
    config: SsaoConfig,
    technique: Option<TechniqueHandle>,
    noise: Option<TextureHandle>,
}

impl SsaoEffect {
    /// Create the effect from configuration
    pub fn new(config: SsaoConfig) -> Self {
        Self {
            config,
            technique: None,
            noise: None,
        }
    }

    /// Current configuration
    pub fn config(&self) -> &SsaoConfig {
        &self.config
    }

    fn ensure_resources(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), RenderError> {
        if self.technique.is_none() {
            let desc = TechniqueDesc {
                name: "post.ssao".to_string(),
                blend: BlendMode::Opaque,
                depth_test: false,
            };
            self.technique = Some(device.compile_technique(&desc)?);
        }

        if self.noise.is_none() {
            // Golden-angle rotation pattern; tiled over the screen to
            // decorrelate the sample kernel between neighboring pixels.
            let mut pixels = Vec::with_capacity((NOISE_SIZE * NOISE_SIZE * 4) as usize);
            for i in 0..(NOISE_SIZE * NOISE_SIZE) {
                let angle = i as f32 * 2.399_963;
                let (sin, cos) = angle.sin_cos();
                pixels.push(((cos * 0.5 + 0.5) * 255.0) as u8);
                pixels.push(((sin * 0.5 + 0.5) * 255.0) as u8);
                pixels.push(0);
                pixels.push(255);
            }
            let desc = TextureDesc {
                label: "ssao.noise",
                width: NOISE_SIZE,
                height: NOISE_SIZE,
                pixels: &pixels,
            };
            self.noise = Some(device.create_texture(&desc)?);
        }

        Ok(())
    }
}

impl PostEffect for SsaoEffect {
    fn name(&self) -> &str {
        "ssao"
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    fn execute(
        &mut self,
        device: &mut dyn GraphicsDevice,
        input: TargetHandle,
        output: TargetHandle,
        chain: &RenderTargetChain,
    ) -> Result<(), RenderError> {
        self.ensure_resources(device)?;
        let technique = self.technique.ok_or(RenderError::TechniqueCompile(
            "post.ssao technique missing".to_string(),
        ))?;

        let params = GpuSsaoParams {
            shape: [
                self.config.radius,
                self.config.intensity,
                self.config.bias,
                self.config.power,
            ],
            samples: [self.config.sample_count as f32, 0.0, 0.0, 0.0],
        };

        device.draw(&DrawBatch {
            technique,
            color_targets: &[output],
            depth_target: None,
            inputs: &[input, chain.depth, chain.normal],
            instances: &[],
            uniforms: bytemuck::bytes_of(&params),
            blend: BlendMode::Opaque,
        })
    }
}
