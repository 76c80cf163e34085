//! Scene graph and object model
//!
//! The [`Scene`] owns the hierarchy of world objects, recomputes world
//! transforms top-down, keeps the spatial index in sync with object bounds,
//! and collects visible draw entries each frame.

pub mod camera;
pub mod graph;
pub mod object;
pub mod template;

pub use camera::{Camera, Projection};
pub use graph::{CollectStats, Scene};
pub use object::{
    AnimatedModel, EntityKind, LayerMask, ObjectDesc, ObjectKey, ParticleEmitter, SceneObject,
};
pub use template::{ModelProvider, ModelTemplate};

use crate::spatial::SpatialError;
use thiserror::Error;

/// Errors reported by scene operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// The object key does not refer to a live object
    #[error("object not found in scene")]
    UnknownObject,

    /// A reparenting operation would create a cycle
    #[error("operation would create a hierarchy cycle")]
    HierarchyCycle,

    /// The model template exists but is still streaming in
    #[error("model template `{0}` is not ready")]
    TemplateNotReady(String),

    /// The model template could not be resolved at all
    #[error("model template `{id}` failed to resolve: {reason}")]
    TemplateFailed {
        /// Requested template id
        id: String,
        /// Provider-reported reason
        reason: String,
    },

    /// Error propagated from the spatial index
    #[error(transparent)]
    Spatial(#[from] SpatialError),
}
