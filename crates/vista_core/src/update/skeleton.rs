//! Bones and skeleton pose computation

use thiserror::Error;

use crate::foundation::math::{Mat4, Transform};

/// Errors reported when constructing a skeleton
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkeletonError {
    /// A bone references a parent at or after its own index
    #[error("bone {child} must come after its parent {parent}")]
    UnorderedBone {
        /// Index of the offending bone
        child: usize,
        /// Index of the referenced parent
        parent: usize,
    },
}

/// Single bone in a skeleton
#[derive(Debug, Clone)]
pub struct Bone {
    /// Bone name, used by animation tracks and attachments
    pub name: String,
    /// Index of the parent bone; None for a root bone
    pub parent: Option<usize>,
    /// Bind-pose transform relative to the parent
    pub local_bind: Transform,
}

/// Bone hierarchy with bind pose
///
/// Bones are stored parents-first so world poses can be computed in a single
/// top-down pass.
#[derive(Debug, Clone)]
pub struct Skeleton {
    bones: Vec<Bone>,
}

impl Skeleton {
    /// Create a skeleton, validating that parents precede children
    pub fn new(bones: Vec<Bone>) -> Result<Self, SkeletonError> {
        for (index, bone) in bones.iter().enumerate() {
            if let Some(parent) = bone.parent {
                if parent >= index {
                    return Err(SkeletonError::UnorderedBone { child: index, parent });
                }
            }
        }
        Ok(Self { bones })
    }

    /// Number of bones
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// Bone storage in parents-first order
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    /// Index of a bone by name
    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    /// Copy of the bind-pose local transforms
    pub fn bind_pose(&self) -> Vec<Transform> {
        self.bones.iter().map(|b| b.local_bind.clone()).collect()
    }

    /// Compute world-space bone matrices from local pose transforms
    ///
    /// `locals` must hold one transform per bone. Parents-first ordering is
    /// what makes the single forward pass sufficient.
    pub fn world_poses(&self, locals: &[Transform]) -> Vec<Mat4> {
        let mut world = Vec::with_capacity(self.bones.len());
        for (index, bone) in self.bones.iter().enumerate() {
            let local = locals
                .get(index)
                .map_or_else(|| bone.local_bind.to_matrix(), Transform::to_matrix);
            let matrix = match bone.parent {
                Some(parent) => world[parent] * local,
                None => local,
            };
            world.push(matrix);
        }
        world
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use approx::assert_relative_eq;

    fn two_bone_arm() -> Skeleton {
        Skeleton::new(vec![
            Bone {
                name: "upper".to_string(),
                parent: None,
                local_bind: Transform::from_position(Vec3::new(0.0, 1.0, 0.0)),
            },
            Bone {
                name: "lower".to_string(),
                parent: Some(0),
                local_bind: Transform::from_position(Vec3::new(0.0, 1.0, 0.0)),
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_rejects_unordered_bones() {
        let result = Skeleton::new(vec![Bone {
            name: "broken".to_string(),
            parent: Some(0),
            local_bind: Transform::identity(),
        }]);
        assert_eq!(
            result.unwrap_err(),
            SkeletonError::UnorderedBone { child: 0, parent: 0 }
        );
    }

    #[test]
    fn test_world_poses_chain_transforms() {
        let skeleton = two_bone_arm();
        let poses = skeleton.world_poses(&skeleton.bind_pose());

        assert_eq!(poses.len(), 2);
        let tip = poses[1].transform_point(&crate::foundation::math::Point3::origin());
        assert_relative_eq!(tip.y, 2.0);
    }

    #[test]
    fn test_bone_lookup_by_name() {
        let skeleton = two_bone_arm();
        assert_eq!(skeleton.bone_index("lower"), Some(1));
        assert_eq!(skeleton.bone_index("tail"), None);
    }
}
