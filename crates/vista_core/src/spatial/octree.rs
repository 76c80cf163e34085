//! Octree spatial partitioning structure
//!
//! Divides 3D space into hierarchical regions for fast visibility queries.
//! Nodes live in an index-based arena: objects hold the index of their owning
//! node and nodes hold object keys, so no raw back-references exist in either
//! direction. A node subdivides into 8 octants when its object count exceeds
//! the configured threshold; objects are stored in the smallest node that
//! fully contains their bounds.

use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;

use crate::foundation::math::Vec3;
use crate::scene::ObjectKey;
use crate::spatial::{Aabb, Frustum, SpatialError, SpatialIndex};

/// Configuration for octree behavior
///
/// The split threshold and minimum cell size are tunables; defaults are
/// validated by the partitioning tests at several thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OctreeConfig {
    /// Maximum objects per node before subdivision
    pub max_objects_per_node: usize,

    /// Maximum subdivision depth
    pub max_depth: u32,

    /// Minimum node half-extent (prevents excessive subdivision)
    pub min_node_size: f32,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            max_objects_per_node: 16,
            max_depth: 8,
            min_node_size: 1.0,
        }
    }
}

/// Single node in the octree arena
#[derive(Debug, Clone)]
struct Node {
    /// World-space bounds of this node
    bounds: Aabb,

    /// Arena index of the parent, None for the root
    parent: Option<u32>,

    /// Arena indices of the 8 octants, None for a leaf
    children: Option<[u32; 8]>,

    /// Objects held directly by this node
    objects: Vec<ObjectKey>,

    /// Depth in the tree (0 = root)
    depth: u32,

    /// Set after removals below; an empty subtree is collapsed on the next query
    dirty: bool,
}

impl Node {
    fn leaf(bounds: Aabb, parent: Option<u32>, depth: u32) -> Self {
        Self {
            bounds,
            parent,
            children: None,
            objects: Vec::new(),
            depth,
            dirty: false,
        }
    }
}

/// Where an object currently lives in the tree
#[derive(Debug, Clone, Copy)]
struct Record {
    node: u32,
    bounds: Aabb,
}

/// Octree spatial index
pub struct Octree {
    nodes: Vec<Node>,
    free: Vec<u32>,
    records: SecondaryMap<ObjectKey, Record>,
    config: OctreeConfig,
}

impl Octree {
    /// Create a new octree covering the given world bounds
    pub fn new(world_bounds: Aabb, config: OctreeConfig) -> Self {
        Self {
            nodes: vec![Node::leaf(world_bounds, None, 0)],
            free: Vec::new(),
            records: SecondaryMap::new(),
            config,
        }
    }

    /// World bounds covered by the root node
    pub fn world_bounds(&self) -> Aabb {
        self.nodes[0].bounds
    }

    /// Current bounds of a tracked object
    pub fn bounds_of(&self, key: ObjectKey) -> Option<Aabb> {
        self.records.get(key).map(|r| r.bounds)
    }

    /// Number of live nodes in the arena (root included)
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Collect all objects whose bounds lie in nodes traversed by a ray
    ///
    /// Candidates are filtered by an exact ray/AABB test against their stored
    /// bounds; callers still need a precise primitive test for picking.
    pub fn query_ray(&self, ray_origin: Vec3, ray_dir: Vec3, out: &mut Vec<ObjectKey>) {
        self.visit_ray(0, ray_origin, ray_dir, out);
    }

    fn alloc(&mut self, node: Node) -> u32 {
        if let Some(idx) = self.free.pop() {
            self.nodes[idx as usize] = node;
            idx
        } else {
            let idx = self.nodes.len() as u32;
            self.nodes.push(node);
            idx
        }
    }

    fn validate(bounds: &Aabb) -> Result<(), SpatialError> {
        if bounds.is_valid() {
            Ok(())
        } else {
            Err(SpatialError::DegenerateBounds {
                min: bounds.min,
                max: bounds.max,
            })
        }
    }

    fn should_split(&self, idx: u32) -> bool {
        let node = &self.nodes[idx as usize];
        node.children.is_none()
            && node.objects.len() >= self.config.max_objects_per_node
            && node.depth < self.config.max_depth
            && node.bounds.extents().x > self.config.min_node_size
    }

    /// Split a leaf into 8 octants and push down objects that fully fit a child
    fn subdivide(&mut self, idx: u32) {
        if self.nodes[idx as usize].children.is_some() {
            return;
        }

        let bounds = self.nodes[idx as usize].bounds;
        let depth = self.nodes[idx as usize].depth;
        let center = bounds.center();
        let quarter = bounds.extents() * 0.5;

        let mut children = [0u32; 8];
        for (octant, slot) in children.iter_mut().enumerate() {
            let x_sign = if octant & 1 != 0 { 1.0 } else { -1.0 };
            let y_sign = if octant & 2 != 0 { 1.0 } else { -1.0 };
            let z_sign = if octant & 4 != 0 { 1.0 } else { -1.0 };

            let child_center = Vec3::new(
                center.x + quarter.x * x_sign,
                center.y + quarter.y * y_sign,
                center.z + quarter.z * z_sign,
            );
            let child = Node::leaf(Aabb::from_center_extents(child_center, quarter), Some(idx), depth + 1);
            *slot = self.alloc(child);
        }
        self.nodes[idx as usize].children = Some(children);

        // Objects that span multiple octants stay in this node
        let held = std::mem::take(&mut self.nodes[idx as usize].objects);
        for key in held {
            let object_bounds = self.records[key].bounds;
            let mut target = idx;
            for &child in &children {
                if self.nodes[child as usize].bounds.contains_aabb(&object_bounds) {
                    target = child;
                    break;
                }
            }
            self.nodes[target as usize].objects.push(key);
            self.records[key].node = target;
        }
    }

    /// Descend to the smallest node fully containing the bounds, splitting
    /// full leaves on the way down
    fn place(&mut self, bounds: &Aabb) -> u32 {
        let mut idx = 0u32;
        loop {
            if self.should_split(idx) {
                self.subdivide(idx);
            }

            let Some(children) = self.nodes[idx as usize].children else {
                return idx;
            };

            let mut next = None;
            for &child in &children {
                if self.nodes[child as usize].bounds.contains_aabb(bounds) {
                    next = Some(child);
                    break;
                }
            }
            match next {
                Some(child) => idx = child,
                None => return idx,
            }
        }
    }

    fn detach(&mut self, key: ObjectKey, node_idx: u32) {
        let objects = &mut self.nodes[node_idx as usize].objects;
        if let Some(pos) = objects.iter().position(|&k| k == key) {
            objects.swap_remove(pos);
        }
        self.mark_dirty_up(node_idx);
    }

    fn mark_dirty_up(&mut self, mut idx: u32) {
        loop {
            self.nodes[idx as usize].dirty = true;
            match self.nodes[idx as usize].parent {
                Some(parent) => idx = parent,
                None => break,
            }
        }
    }

    fn subtree_empty(&self, idx: u32) -> bool {
        let node = &self.nodes[idx as usize];
        node.objects.is_empty()
            && node
                .children
                .map_or(true, |children| children.iter().all(|&c| self.subtree_empty(c)))
    }

    /// Return an empty subtree's children to the free list
    fn free_children(&mut self, idx: u32) {
        if let Some(children) = self.nodes[idx as usize].children.take() {
            for &child in &children {
                self.free_children(child);
                self.free.push(child);
            }
        }
    }

    fn collect_subtree(&self, idx: u32, out: &mut Vec<ObjectKey>) {
        let node = &self.nodes[idx as usize];
        out.extend_from_slice(&node.objects);
        if let Some(children) = node.children {
            for &child in &children {
                self.collect_subtree(child, out);
            }
        }
    }

    fn visit_frustum(&mut self, idx: u32, frustum: &Frustum, out: &mut Vec<ObjectKey>) {
        // Deferred maintenance: collapse empty subtrees flagged by removals
        if self.nodes[idx as usize].dirty {
            if self.nodes[idx as usize].children.is_some() && self.subtree_empty(idx) {
                self.free_children(idx);
            }
            self.nodes[idx as usize].dirty = false;
        }

        let bounds = self.nodes[idx as usize].bounds;
        if !frustum.intersects_aabb(&bounds) {
            return;
        }

        if frustum.contains_aabb(&bounds) {
            // Fully inside: every descendant is visible, no per-object tests
            self.collect_subtree(idx, out);
            return;
        }

        // Partial overlap: test held objects individually, recurse into children
        for i in 0..self.nodes[idx as usize].objects.len() {
            let key = self.nodes[idx as usize].objects[i];
            if frustum.intersects_aabb(&self.records[key].bounds) {
                out.push(key);
            }
        }

        if let Some(children) = self.nodes[idx as usize].children {
            for &child in &children {
                self.visit_frustum(child, frustum, out);
            }
        }
    }

    fn visit_ray(&self, idx: u32, origin: Vec3, dir: Vec3, out: &mut Vec<ObjectKey>) {
        let node = &self.nodes[idx as usize];
        if node.bounds.intersect_ray(origin, dir).is_none() {
            return;
        }

        for &key in &node.objects {
            if self.records[key].bounds.intersect_ray(origin, dir).is_some() {
                out.push(key);
            }
        }

        if let Some(children) = node.children {
            for &child in &children {
                self.visit_ray(child, origin, dir, out);
            }
        }
    }

    fn visit_radius(&self, idx: u32, center: Vec3, radius_squared: f32, out: &mut Vec<ObjectKey>) {
        let node = &self.nodes[idx as usize];
        if node.bounds.distance_squared_to_point(center) > radius_squared {
            return;
        }

        for &key in &node.objects {
            if self.records[key].bounds.distance_squared_to_point(center) <= radius_squared {
                out.push(key);
            }
        }

        if let Some(children) = node.children {
            for &child in &children {
                self.visit_radius(child, center, radius_squared, out);
            }
        }
    }
}

impl SpatialIndex for Octree {
    fn insert(&mut self, key: ObjectKey, bounds: Aabb) -> Result<(), SpatialError> {
        Self::validate(&bounds)?;
        if self.records.contains_key(key) {
            return Err(SpatialError::AlreadyTracked);
        }

        // Objects outside the world volume end up held by the root
        let idx = self.place(&bounds);
        self.nodes[idx as usize].objects.push(key);
        self.records.insert(key, Record { node: idx, bounds });
        Ok(())
    }

    fn remove(&mut self, key: ObjectKey) -> Result<(), SpatialError> {
        let record = self.records.remove(key).ok_or(SpatialError::UnknownObject)?;
        self.detach(key, record.node);
        Ok(())
    }

    fn update(&mut self, key: ObjectKey, bounds: Aabb) -> Result<(), SpatialError> {
        Self::validate(&bounds)?;
        let record = *self.records.get(key).ok_or(SpatialError::UnknownObject)?;

        // Local exit check: stay put while the node still contains the bounds
        if self.nodes[record.node as usize].bounds.contains_aabb(&bounds) {
            self.records[key].bounds = bounds;
            return Ok(());
        }

        // Full reinsertion walk from the root
        self.detach(key, record.node);
        let idx = self.place(&bounds);
        self.nodes[idx as usize].objects.push(key);
        self.records[key] = Record { node: idx, bounds };
        Ok(())
    }

    fn query_frustum(&mut self, frustum: &Frustum, out: &mut Vec<ObjectKey>) {
        self.visit_frustum(0, frustum, out);
    }

    fn query_radius(&self, center: Vec3, radius: f32, out: &mut Vec<ObjectKey>) {
        self.visit_radius(0, center, radius * radius, out);
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn clear(&mut self) {
        let bounds = self.nodes[0].bounds;
        self.nodes.clear();
        self.nodes.push(Node::leaf(bounds, None, 0));
        self.free.clear();
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn world() -> Aabb {
        Aabb::from_center_extents(Vec3::zeros(), Vec3::new(100.0, 100.0, 100.0))
    }

    fn keys(n: usize) -> Vec<ObjectKey> {
        let mut map: SlotMap<ObjectKey, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    fn unit_box(center: Vec3) -> Aabb {
        Aabb::from_center_extents(center, Vec3::new(0.5, 0.5, 0.5))
    }

    #[test]
    fn test_insert_and_count() {
        let mut tree = Octree::new(world(), OctreeConfig::default());
        let keys = keys(3);

        for (i, key) in keys.iter().enumerate() {
            tree.insert(*key, unit_box(Vec3::new(i as f32 * 10.0, 0.0, 0.0))).unwrap();
        }
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_degenerate_bounds_rejected() {
        let mut tree = Octree::new(world(), OctreeConfig::default());
        let keys = keys(1);
        let degenerate = Aabb::new(Vec3::zeros(), Vec3::new(0.0, 1.0, 1.0));

        assert!(matches!(
            tree.insert(keys[0], degenerate),
            Err(SpatialError::DegenerateBounds { .. })
        ));
        assert_eq!(tree.len(), 0);
    }

    #[test]
    fn test_subdivision_on_threshold() {
        let config = OctreeConfig {
            max_objects_per_node: 4,
            max_depth: 4,
            min_node_size: 1.0,
        };
        let mut tree = Octree::new(world(), config);
        let keys = keys(12);

        // Cluster in one octant to force a split
        for (i, key) in keys.iter().enumerate() {
            tree.insert(*key, unit_box(Vec3::new(30.0 + i as f32, 30.0, 30.0))).unwrap();
        }

        assert_eq!(tree.len(), 12);
        assert!(tree.node_count() > 1);
    }

    #[test]
    fn test_query_finds_each_object_once() {
        let mut tree = Octree::new(world(), OctreeConfig {
            max_objects_per_node: 2,
            max_depth: 5,
            min_node_size: 0.5,
        });
        let keys = keys(8);

        for (i, key) in keys.iter().enumerate() {
            let offset = i as f32 * 4.0 - 16.0;
            tree.insert(*key, unit_box(Vec3::new(offset, offset * 0.5, 0.0))).unwrap();
        }

        let everything = Frustum::from_box(&world());
        let mut out = Vec::new();
        tree.query_frustum(&everything, &mut out);

        out.sort();
        let mut expected = keys.clone();
        expected.sort();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_update_relocates_moved_object() {
        let mut tree = Octree::new(world(), OctreeConfig {
            max_objects_per_node: 1,
            max_depth: 5,
            min_node_size: 0.5,
        });
        let keys = keys(3);

        tree.insert(keys[0], unit_box(Vec3::new(-50.0, -50.0, -50.0))).unwrap();
        tree.insert(keys[1], unit_box(Vec3::new(-52.0, -50.0, -50.0))).unwrap();
        tree.insert(keys[2], unit_box(Vec3::new(50.0, 50.0, 50.0))).unwrap();

        // Move the third object across the world
        tree.update(keys[2], unit_box(Vec3::new(-48.0, -50.0, -50.0))).unwrap();

        let old_region = Frustum::from_box(&Aabb::from_center_extents(
            Vec3::new(50.0, 50.0, 50.0),
            Vec3::new(10.0, 10.0, 10.0),
        ));
        let new_region = Frustum::from_box(&Aabb::from_center_extents(
            Vec3::new(-50.0, -50.0, -50.0),
            Vec3::new(10.0, 10.0, 10.0),
        ));

        let mut out = Vec::new();
        tree.query_frustum(&old_region, &mut out);
        assert!(out.is_empty());

        out.clear();
        tree.query_frustum(&new_region, &mut out);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_update_in_place_when_still_contained() {
        let mut tree = Octree::new(world(), OctreeConfig::default());
        let keys = keys(1);

        tree.insert(keys[0], unit_box(Vec3::new(10.0, 10.0, 10.0))).unwrap();
        // Nudge within the same node
        tree.update(keys[0], unit_box(Vec3::new(10.5, 10.0, 10.0))).unwrap();

        assert_eq!(tree.bounds_of(keys[0]).unwrap().center().x, 10.5);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_empty_subtree_collapses_after_query() {
        let config = OctreeConfig {
            max_objects_per_node: 1,
            max_depth: 5,
            min_node_size: 0.5,
        };
        let mut tree = Octree::new(world(), config);
        let keys = keys(4);

        for (i, key) in keys.iter().enumerate() {
            tree.insert(*key, unit_box(Vec3::new(20.0 + i as f32 * 3.0, 20.0, 20.0))).unwrap();
        }
        let populated = tree.node_count();
        assert!(populated > 1);

        for key in &keys {
            tree.remove(*key).unwrap();
        }
        // Collapse is lazy: nodes survive until the next query descends
        assert_eq!(tree.node_count(), populated);

        let mut out = Vec::new();
        tree.query_frustum(&Frustum::from_box(&world()), &mut out);
        assert!(out.is_empty());
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_remove_unknown_object() {
        let mut tree = Octree::new(world(), OctreeConfig::default());
        let keys = keys(1);
        assert_eq!(tree.remove(keys[0]), Err(SpatialError::UnknownObject));
    }

    #[test]
    fn test_ray_query() {
        let mut tree = Octree::new(world(), OctreeConfig::default());
        let keys = keys(2);

        tree.insert(keys[0], unit_box(Vec3::new(0.0, 0.0, 20.0))).unwrap();
        tree.insert(keys[1], unit_box(Vec3::new(30.0, 0.0, 20.0))).unwrap();

        let mut out = Vec::new();
        tree.query_ray(Vec3::new(0.0, 0.0, -50.0), Vec3::new(0.0, 0.0, 1.0), &mut out);
        assert_eq!(out, vec![keys[0]]);
    }

    #[test]
    fn test_radius_query() {
        let mut tree = Octree::new(world(), OctreeConfig::default());
        let keys = keys(3);

        tree.insert(keys[0], unit_box(Vec3::zeros())).unwrap();
        tree.insert(keys[1], unit_box(Vec3::new(5.0, 0.0, 0.0))).unwrap();
        tree.insert(keys[2], unit_box(Vec3::new(50.0, 0.0, 0.0))).unwrap();

        let mut out = Vec::new();
        tree.query_radius(Vec3::zeros(), 10.0, &mut out);
        assert_eq!(out.len(), 2);
    }
}
