//! Update scheduling
//!
//! Advances time-driven state (bone poses, emitters, animated cameras) once
//! per frame, strictly before visibility collection, so the frame's draw
//! reflects the frame's updated bounds and poses. Update order among
//! independent objects is unspecified; dependent chains must be ordered
//! inside the owning object's own update.

pub mod animation;
pub mod skeleton;

pub use animation::{ActiveAnimation, AnimationClip, BoneTrack, Keyframe};
pub use skeleton::{Bone, Skeleton, SkeletonError};

use crate::scene::ObjectKey;

/// Registry of objects that need a per-frame update
///
/// The scene feeds this list to its update pass so static scenery costs
/// nothing per frame.
#[derive(Debug, Default)]
pub struct UpdateList {
    keys: Vec<ObjectKey>,
}

impl UpdateList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object; registering twice is a no-op
    pub fn add(&mut self, key: ObjectKey) {
        if !self.keys.contains(&key) {
            self.keys.push(key);
        }
    }

    /// Unregister an object
    pub fn remove(&mut self, key: ObjectKey) {
        if let Some(pos) = self.keys.iter().position(|&k| k == key) {
            self.keys.swap_remove(pos);
        }
    }

    /// Number of registered objects
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no objects are registered
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Key at a position; used by the scene's index-based update loop
    pub fn get(&self, index: usize) -> Option<ObjectKey> {
        self.keys.get(index).copied()
    }

    /// Iterate registered keys (unspecified order)
    pub fn iter(&self) -> impl Iterator<Item = ObjectKey> + '_ {
        self.keys.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_add_is_idempotent() {
        let mut map: SlotMap<ObjectKey, ()> = SlotMap::with_key();
        let key = map.insert(());

        let mut list = UpdateList::new();
        list.add(key);
        list.add(key);
        assert_eq!(list.len(), 1);

        list.remove(key);
        assert!(list.is_empty());
    }
}
