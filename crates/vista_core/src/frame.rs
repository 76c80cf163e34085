//! Frame driver
//!
//! [`RenderContext`] owns the backend capabilities, the deferred pipeline,
//! the technique registry, and the per-frame buffers, and threads them
//! through the fixed frame sequence: update, transform flush, camera
//! refresh, visibility collection, render. There is no global engine state;
//! the application owns the context and passes it down the call chain.

use thiserror::Error;

use crate::config::CoreConfig;
use crate::draw::DrawQueue;
use crate::foundation::time::FrameClock;
use crate::render::{
    DeferredPipeline, GraphicsDevice, LightingEnvironment, PresentTarget, RenderError,
    TechniqueDesc, TechniqueHandle, TechniqueId, TechniqueRegistry,
};
use crate::scene::{Camera, Scene, SceneError};

/// Errors that abort a frame
#[derive(Error, Debug)]
pub enum FrameError {
    /// Rendering failure (only device loss aborts a frame)
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Scene failure during frame preparation
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Combined statistics for one frame
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    /// Delta time used for this frame's updates, in seconds
    pub delta_time: f32,
    /// Whether the target chain was recreated at this frame boundary
    pub resized: bool,
    /// Candidates returned by the spatial index
    pub considered: usize,
    /// Candidates rejected by exact tests
    pub culled: usize,
    /// Entries submitted to the draw queue
    pub drawn: usize,
    /// Entries dropped for missing techniques
    pub dropped: usize,
    /// Batched draw submissions issued
    pub draw_calls: u32,
    /// Lights accumulated
    pub lights: u32,
    /// Post effects that ran
    pub effects_run: u32,
    /// Post effects skipped due to errors
    pub effects_skipped: u32,
    /// Recoverable pass errors absorbed
    pub pass_errors: u32,
}

/// Everything the frame loop needs, owned in one place
///
/// Drives update, cull, collect, and render in a fixed order each frame;
/// this ordering is a correctness requirement since each stage consumes the
/// previous stage's output. Not thread-safe: the context lives on the
/// frame-loop thread.
pub struct RenderContext<D: GraphicsDevice, P: PresentTarget> {
    device: D,
    presenter: P,
    pipeline: DeferredPipeline,
    techniques: TechniqueRegistry,
    clock: FrameClock,
    queue: DrawQueue,
    lights: LightingEnvironment,
}

impl<D: GraphicsDevice, P: PresentTarget> RenderContext<D, P> {
    /// Create the context and the pipeline's target chain
    pub fn new(mut device: D, presenter: P, config: &CoreConfig) -> Result<Self, FrameError> {
        let extent = presenter.viewport_size();
        let pipeline = DeferredPipeline::new(&mut device, extent, &config.pipeline)?;

        Ok(Self {
            device,
            presenter,
            pipeline,
            techniques: TechniqueRegistry::new(),
            clock: FrameClock::new(),
            queue: DrawQueue::new(),
            lights: LightingEnvironment::new(),
        })
    }

    /// Compile and register a technique for scene objects to reference
    pub fn register_technique(
        &mut self,
        id: TechniqueId,
        desc: &TechniqueDesc,
    ) -> Result<TechniqueHandle, RenderError> {
        self.techniques.register(id, &mut self.device, desc)
    }

    /// The technique registry
    pub fn techniques(&self) -> &TechniqueRegistry {
        &self.techniques
    }

    /// The graphics device capability
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// The presentation capability
    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    /// The deferred pipeline
    pub fn pipeline(&self) -> &DeferredPipeline {
        &self.pipeline
    }

    /// Mutable pipeline access, e.g. for toggling post effects
    pub fn pipeline_mut(&mut self) -> &mut DeferredPipeline {
        &mut self.pipeline
    }

    /// The frame clock
    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Run one frame: update, cull, collect, render, present
    ///
    /// Once collection has begun the frame always runs to completion;
    /// resize signals are observed only at the boundary at the top of this
    /// method. Only [`RenderError::DeviceLost`] (or a scene failure during
    /// preparation) aborts — the owning application must then rebuild the
    /// context.
    pub fn run_frame(&mut self, scene: &mut Scene, camera: &mut Camera) -> Result<FrameStats, FrameError> {
        // Frame boundary: apply any viewport change before collection so an
        // in-flight resize can never mix resolutions within a frame
        self.pipeline.request_resize(self.presenter.viewport_size());
        let resized = self.pipeline.apply_resize(&mut self.device)?;
        if resized {
            // Whatever was collected for the old resolution is now stale
            self.queue.clear();
            let (width, height) = self.presenter.viewport_size();
            if height > 0 {
                camera.set_aspect(width as f32 / height as f32);
            }
        }

        let dt = self.clock.tick();

        // Update strictly precedes visibility so this frame's draw sees this
        // frame's poses and bounds
        scene.update(dt);
        scene.flush_transforms();
        camera.refresh();

        self.queue.clear();
        let collect = scene.collect_visible(camera, &mut self.queue, &self.techniques, &mut self.lights);

        let render = self.pipeline.render_frame(
            &mut self.device,
            &self.queue,
            &self.lights,
            camera,
            &self.techniques,
            &mut self.presenter,
        )?;

        Ok(FrameStats {
            delta_time: dt,
            resized,
            considered: collect.considered,
            culled: collect.culled,
            drawn: collect.drawn,
            dropped: collect.dropped,
            draw_calls: render.draw_calls,
            lights: render.lights_accumulated,
            effects_run: render.effects_run,
            effects_skipped: render.effects_skipped,
            pass_errors: render.pass_errors,
        })
    }
}
