//! Engine core configuration
//!
//! Plain serializable structs with sensible defaults; the application layer
//! decides where they are loaded from.

use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec3;
use crate::render::post::{BloomConfig, SsaoConfig};
use crate::spatial::OctreeConfig;

/// Scene-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Half-extent of the world volume covered by the spatial index
    pub world_extent: f32,

    /// Ambient light color
    pub ambient_color: Vec3,

    /// Ambient light intensity
    pub ambient_intensity: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            world_extent: 512.0,
            ambient_color: Vec3::new(1.0, 1.0, 1.0),
            ambient_intensity: 0.1,
        }
    }
}

/// Deferred pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Screen-space ambient occlusion settings
    pub ssao: SsaoConfig,

    /// Bloom settings
    pub bloom: BloomConfig,
}

/// Top-level configuration for the rendering core
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Scene-level settings
    pub scene: SceneConfig,

    /// Spatial index tuning
    pub octree: OctreeConfig,

    /// Deferred pipeline settings
    pub pipeline: PipelineConfig,
}
