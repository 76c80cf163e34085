//! Spatial index trait and the linear fallback implementation
//!
//! Allows pluggable spatial data structures behind the scene graph. The
//! octree is the production structure; [`LinearIndex`] performs brute-force
//! scans and doubles as the oracle in property tests.

use crate::foundation::math::Vec3;
use crate::scene::ObjectKey;
use crate::spatial::{Aabb, Frustum, SpatialError};

/// Trait for spatial data structures used in visibility determination
///
/// All implementations share the same contract: an object is tracked under
/// exactly one key at a time, degenerate bounds are rejected, and frustum
/// queries return each intersecting object exactly once, in no particular
/// order.
pub trait SpatialIndex {
    /// Track an object under the given bounds
    fn insert(&mut self, key: ObjectKey, bounds: Aabb) -> Result<(), SpatialError>;

    /// Stop tracking an object
    fn remove(&mut self, key: ObjectKey) -> Result<(), SpatialError>;

    /// Replace an object's bounds after it moved
    fn update(&mut self, key: ObjectKey, bounds: Aabb) -> Result<(), SpatialError>;

    /// Collect all objects whose bounds intersect the frustum
    ///
    /// Takes `&mut self` so implementations may perform deferred maintenance
    /// (e.g. collapsing empty subtrees) during the descent.
    fn query_frustum(&mut self, frustum: &Frustum, out: &mut Vec<ObjectKey>);

    /// Collect all objects whose bounds touch a sphere
    fn query_radius(&self, center: Vec3, radius: f32, out: &mut Vec<ObjectKey>);

    /// Number of tracked objects
    fn len(&self) -> usize;

    /// Whether the index is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove all tracked objects
    fn clear(&mut self);
}

/// Simple list-based index with no spatial optimization
///
/// Performs a linear scan for every query. Sufficient for small scenes and
/// used as the brute-force reference when validating the octree.
#[derive(Debug, Default)]
pub struct LinearIndex {
    entries: Vec<(ObjectKey, Aabb)>,
}

impl LinearIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, key: ObjectKey) -> Option<usize> {
        self.entries.iter().position(|(k, _)| *k == key)
    }
}

impl SpatialIndex for LinearIndex {
    fn insert(&mut self, key: ObjectKey, bounds: Aabb) -> Result<(), SpatialError> {
        if !bounds.is_valid() {
            return Err(SpatialError::DegenerateBounds {
                min: bounds.min,
                max: bounds.max,
            });
        }
        if self.position(key).is_some() {
            return Err(SpatialError::AlreadyTracked);
        }

        self.entries.push((key, bounds));
        Ok(())
    }

    fn remove(&mut self, key: ObjectKey) -> Result<(), SpatialError> {
        let index = self.position(key).ok_or(SpatialError::UnknownObject)?;
        self.entries.swap_remove(index);
        Ok(())
    }

    fn update(&mut self, key: ObjectKey, bounds: Aabb) -> Result<(), SpatialError> {
        if !bounds.is_valid() {
            return Err(SpatialError::DegenerateBounds {
                min: bounds.min,
                max: bounds.max,
            });
        }
        let index = self.position(key).ok_or(SpatialError::UnknownObject)?;
        self.entries[index].1 = bounds;
        Ok(())
    }

    fn query_frustum(&mut self, frustum: &Frustum, out: &mut Vec<ObjectKey>) {
        out.extend(
            self.entries
                .iter()
                .filter(|(_, bounds)| frustum.intersects_aabb(bounds))
                .map(|(key, _)| *key),
        );
    }

    fn query_radius(&self, center: Vec3, radius: f32, out: &mut Vec<ObjectKey>) {
        let radius_squared = radius * radius;
        out.extend(
            self.entries
                .iter()
                .filter(|(_, bounds)| bounds.distance_squared_to_point(center) <= radius_squared)
                .map(|(key, _)| *key),
        );
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn keys(n: usize) -> Vec<ObjectKey> {
        let mut map: SlotMap<ObjectKey, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    #[test]
    fn test_linear_index_add_remove() {
        let mut index = LinearIndex::new();
        let keys = keys(2);
        let bounds = Aabb::from_center_extents(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));

        index.insert(keys[0], bounds).unwrap();
        index.insert(keys[1], bounds).unwrap();
        assert_eq!(index.len(), 2);

        index.remove(keys[0]).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.remove(keys[0]), Err(SpatialError::UnknownObject));
    }

    #[test]
    fn test_linear_index_rejects_degenerate_bounds() {
        let mut index = LinearIndex::new();
        let keys = keys(1);
        let degenerate = Aabb::new(Vec3::new(1.0, 1.0, 1.0), Vec3::zeros());

        assert!(matches!(
            index.insert(keys[0], degenerate),
            Err(SpatialError::DegenerateBounds { .. })
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn test_linear_index_duplicate_insert() {
        let mut index = LinearIndex::new();
        let keys = keys(1);
        let bounds = Aabb::from_center_extents(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));

        index.insert(keys[0], bounds).unwrap();
        assert_eq!(index.insert(keys[0], bounds), Err(SpatialError::AlreadyTracked));
    }

    #[test]
    fn test_linear_index_radius_query() {
        let mut index = LinearIndex::new();
        let keys = keys(2);
        let near = Aabb::from_center_extents(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
        let far = Aabb::from_center_extents(Vec3::new(50.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0));

        index.insert(keys[0], near).unwrap();
        index.insert(keys[1], far).unwrap();

        let mut out = Vec::new();
        index.query_radius(Vec3::zeros(), 10.0, &mut out);
        assert_eq!(out, vec![keys[0]]);
    }
}
