//! Deferred lighting pipeline
//!
//! Executes the fixed per-frame pass sequence: geometry into the G-buffer,
//! per-light accumulation, composite, the post-process chain, and present.
//! Stages never run out of order and never skip backward within a frame;
//! passes with no visible output still clear their targets so the buffer
//! state stays consistent for the next frame.

use bytemuck::{Pod, Zeroable};

use crate::config::PipelineConfig;
use crate::draw::{DrawPhase, DrawQueue};
use crate::foundation::math::Mat4;
use crate::render::post::{BloomEffect, PostEffect, SsaoEffect};
use crate::render::{
    BlendMode, ClearValue, DrawBatch, GraphicsDevice, LightType, LightingEnvironment,
    PresentTarget, RenderError, RenderTargetChain, TargetHandle, TechniqueDesc, TechniqueHandle,
    TechniqueRegistry,
};
use crate::scene::Camera;

/// Stage of the deferred pipeline
///
/// The per-frame sequence is fixed and strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineStage {
    /// Opaque geometry drawn into the G-buffer
    Geometry,
    /// Per-light radiance accumulation
    LightAccumulation,
    /// Albedo and radiance combined into a shaded image
    Composite,
    /// Optional screen-space effect chain
    PostProcess,
    /// Final target handed to the presentation collaborator
    Present,
}

/// Counters for one rendered frame
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderStats {
    /// Batched draw submissions issued
    pub draw_calls: u32,
    /// Lights accumulated this frame
    pub lights_accumulated: u32,
    /// Post-process effects that ran
    pub effects_run: u32,
    /// Post-process effects skipped due to errors
    pub effects_skipped: u32,
    /// Recoverable pass errors absorbed this frame
    pub pass_errors: u32,
}

/// Per-frame uniform block shared by geometry and forward draws
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct GpuFrameBlock {
    view_proj: [[f32; 4]; 4],
    camera_position: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct GpuAmbientBlock {
    /// rgb ambient color, w ambient intensity
    ambient: [f32; 4],
}

/// Techniques compiled by the pipeline itself
#[derive(Debug, Clone, Copy)]
struct InternalTechniques {
    directional: TechniqueHandle,
    volume: TechniqueHandle,
    composite: TechniqueHandle,
}

/// Absorb a recoverable pass error; only device loss aborts the frame
fn tolerate(
    result: Result<(), RenderError>,
    what: &str,
    stats: &mut RenderStats,
) -> Result<bool, RenderError> {
    match result {
        Ok(()) => Ok(true),
        Err(RenderError::DeviceLost) => Err(RenderError::DeviceLost),
        Err(e) => {
            log::error!("{what} failed: {e}");
            stats.pass_errors += 1;
            Ok(false)
        }
    }
}

/// The deferred lighting pipeline
///
/// Owns the render target chain and the post-process effects. All GPU access
/// goes through the [`GraphicsDevice`] passed into each call; the pipeline
/// must only be used from the frame-loop thread.
pub struct DeferredPipeline {
    targets: RenderTargetChain,
    internal: InternalTechniques,
    effects: Vec<Box<dyn PostEffect>>,
    stage: PipelineStage,
    pending_resize: Option<(u32, u32)>,
    scratch_instances: Vec<Mat4>,
}

impl DeferredPipeline {
    /// Create the pipeline, its target chain, and its built-in effects
    pub fn new(
        device: &mut dyn GraphicsDevice,
        extent: (u32, u32),
        config: &PipelineConfig,
    ) -> Result<Self, RenderError> {
        let targets = RenderTargetChain::create(device, extent)?;

        let specs = [
            ("deferred.light.directional", BlendMode::Additive),
            ("deferred.light.volume", BlendMode::Additive),
            ("deferred.composite", BlendMode::Opaque),
        ];
        let mut handles = [TechniqueHandle(0); 3];
        for (slot, (name, blend)) in handles.iter_mut().zip(specs) {
            let desc = TechniqueDesc {
                name: name.to_string(),
                blend,
                depth_test: false,
            };
            match device.compile_technique(&desc) {
                Ok(handle) => *slot = handle,
                Err(e) => {
                    targets.destroy(device);
                    return Err(e);
                }
            }
        }

        let effects: Vec<Box<dyn PostEffect>> = vec![
            Box::new(SsaoEffect::new(config.ssao.clone())),
            Box::new(BloomEffect::new(config.bloom.clone())),
        ];

        log::info!("deferred pipeline initialized at {}x{}", extent.0, extent.1);

        Ok(Self {
            targets,
            internal: InternalTechniques {
                directional: handles[0],
                volume: handles[1],
                composite: handles[2],
            },
            effects,
            stage: PipelineStage::Geometry,
            pending_resize: None,
            scratch_instances: Vec::new(),
        })
    }

    /// The off-screen target chain
    pub fn targets(&self) -> &RenderTargetChain {
        &self.targets
    }

    /// Stage most recently entered
    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Enable or disable a post effect by name; false if no effect matches
    pub fn set_effect_enabled(&mut self, name: &str, enabled: bool) -> bool {
        for effect in &mut self.effects {
            if effect.name() == name {
                effect.set_enabled(enabled);
                return true;
            }
        }
        false
    }

    /// Note a new output resolution to apply at the next frame boundary
    pub fn request_resize(&mut self, extent: (u32, u32)) {
        if extent != self.targets.extent() && extent.0 > 0 && extent.1 > 0 {
            self.pending_resize = Some(extent);
        }
    }

    /// Whether a resize is waiting for the next frame boundary
    pub fn resize_pending(&self) -> bool {
        self.pending_resize.is_some()
    }

    /// Recreate the target chain if a resize was requested
    ///
    /// Returns true if the chain was recreated; the caller must discard any
    /// draw collection made against the old resolution.
    pub fn apply_resize(&mut self, device: &mut dyn GraphicsDevice) -> Result<bool, RenderError> {
        let Some(extent) = self.pending_resize.take() else {
            return Ok(false);
        };

        self.targets.recreate(device, extent)?;
        for effect in &mut self.effects {
            if let Err(e) = effect.resize(device, extent) {
                log::warn!("effect `{}` resize failed: {e}", effect.name());
            }
        }
        log::info!("render target chain recreated at {}x{}", extent.0, extent.1);
        Ok(true)
    }

    /// Render one frame from the sorted draw queue and lighting environment
    ///
    /// Recoverable errors are absorbed per pass and counted in the returned
    /// stats; [`RenderError::DeviceLost`] aborts and must be handled by the
    /// owning application.
    pub fn render_frame(
        &mut self,
        device: &mut dyn GraphicsDevice,
        queue: &DrawQueue,
        lights: &LightingEnvironment,
        camera: &Camera,
        registry: &TechniqueRegistry,
        presenter: &mut dyn PresentTarget,
    ) -> Result<RenderStats, RenderError> {
        let mut stats = RenderStats::default();
        let position = camera.position();
        let frame_block = GpuFrameBlock {
            view_proj: camera.view_projection().into(),
            camera_position: [position.x, position.y, position.z, 1.0],
        };

        self.stage = PipelineStage::Geometry;
        self.geometry_pass(device, queue, registry, &frame_block, &mut stats)?;

        self.enter(PipelineStage::LightAccumulation);
        self.light_pass(device, lights, &mut stats)?;

        self.enter(PipelineStage::Composite);
        self.composite_pass(device, lights, &mut stats)?;
        self.forward_pass(device, queue, registry, &frame_block, &mut stats)?;

        self.enter(PipelineStage::PostProcess);
        let final_target = self.post_process(device, &mut stats)?;
        self.overlay_pass(device, queue, registry, final_target, &frame_block, &mut stats)?;

        self.enter(PipelineStage::Present);
        match presenter.present(final_target) {
            Ok(()) => {}
            Err(RenderError::DeviceLost) => return Err(RenderError::DeviceLost),
            Err(e) => {
                log::error!("present failed: {e}");
                stats.pass_errors += 1;
            }
        }

        Ok(stats)
    }

    fn enter(&mut self, next: PipelineStage) {
        debug_assert!(next >= self.stage, "pipeline stages cannot skip backward");
        self.stage = next;
    }

    fn geometry_pass(
        &mut self,
        device: &mut dyn GraphicsDevice,
        queue: &DrawQueue,
        registry: &TechniqueRegistry,
        frame: &GpuFrameBlock,
        stats: &mut RenderStats,
    ) -> Result<(), RenderError> {
        let t = self.targets;

        // Cleared even when the layer is empty
        tolerate(device.clear_target(t.depth, &ClearValue::BLACK), "clear gbuffer depth", stats)?;
        tolerate(device.clear_target(t.normal, &ClearValue::BLACK), "clear gbuffer normal", stats)?;
        tolerate(device.clear_target(t.albedo, &ClearValue::BLACK), "clear gbuffer albedo", stats)?;

        for group in queue.layer(DrawPhase::Opaque).groups() {
            if group.is_empty() {
                continue;
            }
            let Some(technique) = registry.handle_of(group.technique) else {
                log::warn!("no GPU technique for {:?}; dropping group", group.technique);
                stats.pass_errors += 1;
                continue;
            };

            self.scratch_instances.clear();
            self.scratch_instances.extend(group.entries.iter().map(|e| e.transform));

            let drawn = tolerate(
                device.draw(&DrawBatch {
                    technique,
                    color_targets: &[t.normal, t.albedo],
                    depth_target: Some(t.depth),
                    inputs: &[],
                    instances: &self.scratch_instances,
                    uniforms: bytemuck::bytes_of(frame),
                    blend: BlendMode::Opaque,
                }),
                "geometry draw",
                stats,
            )?;
            if drawn {
                stats.draw_calls += 1;
            }
        }

        Ok(())
    }

    fn light_pass(
        &mut self,
        device: &mut dyn GraphicsDevice,
        lights: &LightingEnvironment,
        stats: &mut RenderStats,
    ) -> Result<(), RenderError> {
        let t = self.targets;

        tolerate(
            device.clear_target(t.light_accum, &ClearValue::BLACK),
            "clear light accumulation",
            stats,
        )?;

        for light in &lights.lights {
            let gpu = light.to_gpu();

            // Directional lights cover the whole screen; point and spot
            // lights are bounded by their volume transform.
            let (technique, volume) = match light.light_type {
                LightType::Directional => (self.internal.directional, None),
                LightType::Point | LightType::Spot => {
                    let scale = Mat4::new_scaling(light.range.max(f32::EPSILON));
                    (
                        self.internal.volume,
                        Some(Mat4::new_translation(&light.position) * scale),
                    )
                }
            };

            self.scratch_instances.clear();
            if let Some(volume) = volume {
                self.scratch_instances.push(volume);
            }

            let drawn = tolerate(
                device.draw(&DrawBatch {
                    technique,
                    color_targets: &[t.light_accum],
                    depth_target: None,
                    inputs: &[t.depth, t.normal, t.albedo],
                    instances: &self.scratch_instances,
                    uniforms: bytemuck::bytes_of(&gpu),
                    blend: BlendMode::Additive,
                }),
                "light accumulation draw",
                stats,
            )?;
            if drawn {
                stats.draw_calls += 1;
                stats.lights_accumulated += 1;
            }
        }

        Ok(())
    }

    fn composite_pass(
        &mut self,
        device: &mut dyn GraphicsDevice,
        lights: &LightingEnvironment,
        stats: &mut RenderStats,
    ) -> Result<(), RenderError> {
        let t = self.targets;
        let ambient = GpuAmbientBlock {
            ambient: [
                lights.ambient_color.x,
                lights.ambient_color.y,
                lights.ambient_color.z,
                lights.ambient_intensity,
            ],
        };

        let drawn = tolerate(
            device.draw(&DrawBatch {
                technique: self.internal.composite,
                color_targets: &[t.post_a],
                depth_target: None,
                inputs: &[t.albedo, t.light_accum],
                instances: &[],
                uniforms: bytemuck::bytes_of(&ambient),
                blend: BlendMode::Opaque,
            }),
            "composite draw",
            stats,
        )?;
        if drawn {
            stats.draw_calls += 1;
        }
        Ok(())
    }

    /// Forward pass for blended geometry, drawn back-to-front onto the
    /// composite output with the geometry depth buffer for occlusion
    fn forward_pass(
        &mut self,
        device: &mut dyn GraphicsDevice,
        queue: &DrawQueue,
        registry: &TechniqueRegistry,
        frame: &GpuFrameBlock,
        stats: &mut RenderStats,
    ) -> Result<(), RenderError> {
        let t = self.targets;

        for group in queue.layer(DrawPhase::Transparent).groups() {
            if group.is_empty() {
                continue;
            }
            let Some(technique) = registry.handle_of(group.technique) else {
                log::warn!("no GPU technique for {:?}; dropping group", group.technique);
                stats.pass_errors += 1;
                continue;
            };

            self.scratch_instances.clear();
            self.scratch_instances.extend(group.entries.iter().map(|e| e.transform));

            let drawn = tolerate(
                device.draw(&DrawBatch {
                    technique,
                    color_targets: &[t.post_a],
                    depth_target: Some(t.depth),
                    inputs: &[],
                    instances: &self.scratch_instances,
                    uniforms: bytemuck::bytes_of(frame),
                    blend: BlendMode::Alpha,
                }),
                "forward draw",
                stats,
            )?;
            if drawn {
                stats.draw_calls += 1;
            }
        }

        Ok(())
    }

    /// Run enabled effects, ping-ponging between the post targets
    ///
    /// Returns the target holding the final image. With every effect disabled
    /// this is the untouched composite output.
    fn post_process(
        &mut self,
        device: &mut dyn GraphicsDevice,
        stats: &mut RenderStats,
    ) -> Result<TargetHandle, RenderError> {
        let chain = self.targets;
        let mut current = chain.post_a;

        for effect in &mut self.effects {
            if !effect.enabled() {
                continue;
            }
            let output = if current == chain.post_a { chain.post_b } else { chain.post_a };
            match effect.execute(device, current, output, &chain) {
                Ok(()) => {
                    current = output;
                    stats.effects_run += 1;
                }
                Err(RenderError::DeviceLost) => return Err(RenderError::DeviceLost),
                Err(e) => {
                    log::warn!("post effect `{}` failed: {e}; passing through", effect.name());
                    stats.effects_skipped += 1;
                }
            }
        }

        Ok(current)
    }

    /// Screen-space overlays drawn onto the final target in submission order
    fn overlay_pass(
        &mut self,
        device: &mut dyn GraphicsDevice,
        queue: &DrawQueue,
        registry: &TechniqueRegistry,
        target: TargetHandle,
        frame: &GpuFrameBlock,
        stats: &mut RenderStats,
    ) -> Result<(), RenderError> {
        for group in queue.layer(DrawPhase::Overlay).groups() {
            if group.is_empty() {
                continue;
            }
            let Some(technique) = registry.handle_of(group.technique) else {
                log::warn!("no GPU technique for {:?}; dropping group", group.technique);
                stats.pass_errors += 1;
                continue;
            };

            self.scratch_instances.clear();
            self.scratch_instances.extend(group.entries.iter().map(|e| e.transform));

            let drawn = tolerate(
                device.draw(&DrawBatch {
                    technique,
                    color_targets: &[target],
                    depth_target: None,
                    inputs: &[],
                    instances: &self.scratch_instances,
                    uniforms: bytemuck::bytes_of(frame),
                    blend: BlendMode::Alpha,
                }),
                "overlay draw",
                stats,
            )?;
            if drawn {
                stats.draw_calls += 1;
            }
        }

        Ok(())
    }
}
