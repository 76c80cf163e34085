//! Spatial partitioning and visibility primitives
//!
//! Provides the bounding-volume types shared across the engine and the
//! spatial index used for frustum culling, following Game Engine Architecture
//! Chapter 11.2.7.4 - Scene Graphs.

pub mod bounds;
pub mod index;
pub mod octree;

pub use bounds::{Aabb, Frustum, Plane};
pub use index::{LinearIndex, SpatialIndex};
pub use octree::{Octree, OctreeConfig};

use crate::foundation::math::Vec3;
use thiserror::Error;

/// Errors reported by spatial index operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpatialError {
    /// Bounds with zero, negative, or non-finite extents were rejected
    #[error("degenerate bounds: min {min:?} max {max:?}")]
    DegenerateBounds {
        /// Minimum corner of the rejected volume
        min: Vec3,
        /// Maximum corner of the rejected volume
        max: Vec3,
    },

    /// The object is already tracked by the index
    #[error("object is already tracked by the spatial index")]
    AlreadyTracked,

    /// The object is not tracked by the index
    #[error("object is not tracked by the spatial index")]
    UnknownObject,
}
