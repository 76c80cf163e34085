//! # Vista Core
//!
//! The scene-management and rendering core of a real-time 3D engine.
//!
//! ## Features
//!
//! - **Spatial Index**: Octree partitioning with frustum, ray, and radius queries
//! - **Scene Graph**: Hierarchical objects with transform inheritance
//! - **Draw Collection**: Per-frame visibility, material batching, sorted layers
//! - **Deferred Pipeline**: Geometry, light accumulation, composite, and
//!   post-process passes against off-screen targets
//! - **Update Scheduling**: Skeletal animation and emitter state advanced once
//!   per frame ahead of visibility collection
//!
//! The core never talks to a graphics API directly. Backends supply the
//! [`render::GraphicsDevice`] and [`render::PresentTarget`] capabilities;
//! asset systems supply [`scene::ModelProvider`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vista_core::prelude::*;
//!
//! # fn demo(device: impl GraphicsDevice, presenter: impl PresentTarget) -> Result<(), FrameError> {
//! let config = CoreConfig::default();
//! let mut context = RenderContext::new(device, presenter, &config)?;
//! let mut scene = Scene::new(&config.scene, &config.octree);
//! let mut camera = Camera::perspective(60.0_f32.to_radians(), 16.0 / 9.0, 0.1, 500.0);
//!
//! loop {
//!     let stats = context.run_frame(&mut scene, &mut camera)?;
//!     let _ = stats.draw_calls;
//! }
//! # }
//! ```

pub mod foundation;
pub mod spatial;
pub mod scene;
pub mod draw;
pub mod render;
pub mod update;

mod config;
mod frame;

pub use config::{CoreConfig, PipelineConfig, SceneConfig};
pub use frame::{FrameError, FrameStats, RenderContext};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{CoreConfig, PipelineConfig, SceneConfig},
        draw::{DrawPhase, DrawQueue},
        foundation::{
            math::{Mat4, Quat, Transform, Vec3},
            time::FrameClock,
        },
        frame::{FrameError, FrameStats, RenderContext},
        render::{
            GraphicsDevice, Light, LightingEnvironment, PresentTarget, RenderError, TechniqueId,
        },
        scene::{Camera, LayerMask, ModelProvider, ObjectKey, Scene, SceneError},
        spatial::{Aabb, Frustum, Octree, OctreeConfig, SpatialError, SpatialIndex},
    };
}
