//! Keyframe animation sampling
//!
//! Clips hold per-bone keyframe tracks; playback state lives in
//! [`ActiveAnimation`]. Sampling interpolates translation linearly and
//! rotation by quaternion slerp between the surrounding keyframes.

use std::sync::Arc;

use crate::foundation::math::{Quat, Transform, Vec3};
use crate::update::skeleton::Skeleton;

/// Single keyframe of a bone track
#[derive(Debug, Clone)]
pub struct Keyframe {
    /// Time of the keyframe in seconds
    pub time: f32,
    /// Translation relative to the parent bone
    pub translation: Vec3,
    /// Rotation relative to the parent bone
    pub rotation: Quat,
}

/// Keyframes for one bone, sorted by time
#[derive(Debug, Clone)]
pub struct BoneTrack {
    /// Index of the bone this track drives
    pub bone: usize,
    /// Keyframes in ascending time order
    pub keyframes: Vec<Keyframe>,
}

impl BoneTrack {
    /// Sample the track at a time, clamping at both ends
    fn sample(&self, time: f32) -> Option<(Vec3, Quat)> {
        let first = self.keyframes.first()?;
        let last = self.keyframes.last()?;

        if time <= first.time {
            return Some((first.translation, first.rotation));
        }
        if time >= last.time {
            return Some((last.translation, last.rotation));
        }

        let next_index = self.keyframes.partition_point(|k| k.time <= time);
        let prev = &self.keyframes[next_index - 1];
        let next = &self.keyframes[next_index];

        let span = next.time - prev.time;
        let t = if span > f32::EPSILON { (time - prev.time) / span } else { 0.0 };

        let translation = prev.translation.lerp(&next.translation, t);
        // Antipodal keyframes have no unique slerp path; snap to the nearer end
        let rotation = prev
            .rotation
            .try_slerp(&next.rotation, t, f32::EPSILON)
            .unwrap_or(if t < 0.5 { prev.rotation } else { next.rotation });

        Some((translation, rotation))
    }
}

/// Shared, immutable animation clip
#[derive(Debug, Clone)]
pub struct AnimationClip {
    /// Clip name for lookups and logging
    pub name: String,
    /// Clip length in seconds
    pub duration: f32,
    /// Per-bone keyframe tracks
    pub tracks: Vec<BoneTrack>,
}

/// Playback state of a clip on one model
#[derive(Debug, Clone)]
pub struct ActiveAnimation {
    /// The clip being played (shared across instances)
    pub clip: Arc<AnimationClip>,
    /// Playback speed multiplier
    pub speed: f32,
    /// Whether playback wraps at the clip end
    pub looping: bool,
    time: f32,
    finished: bool,
}

impl ActiveAnimation {
    /// Start playing a clip from the beginning
    pub fn new(clip: Arc<AnimationClip>, looping: bool) -> Self {
        Self {
            clip,
            speed: 1.0,
            looping,
            time: 0.0,
            finished: false,
        }
    }

    /// Current playback position in seconds
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Whether a non-looping clip has reached its end
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Advance playback by a frame delta
    pub fn advance(&mut self, dt: f32) {
        if self.finished || self.clip.duration <= 0.0 {
            return;
        }

        self.time += dt * self.speed;
        if self.looping {
            self.time = self.time.rem_euclid(self.clip.duration);
        } else if self.time >= self.clip.duration {
            self.time = self.clip.duration;
            self.finished = true;
        }
    }

    /// Sample the clip into local bone transforms
    ///
    /// Starts from the skeleton's bind pose; bones without a track keep
    /// their bind transform.
    pub fn sample_pose(&self, skeleton: &Skeleton) -> Vec<Transform> {
        let mut pose = skeleton.bind_pose();
        for track in &self.clip.tracks {
            let Some(slot) = pose.get_mut(track.bone) else {
                log::warn!(
                    "clip `{}` drives bone {} outside skeleton ({} bones)",
                    self.clip.name,
                    track.bone,
                    skeleton.bone_count()
                );
                continue;
            };
            if let Some((translation, rotation)) = track.sample(self.time) {
                slot.position = translation;
                slot.rotation = rotation;
            }
        }
        pose
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::skeleton::Bone;
    use approx::assert_relative_eq;

    fn single_bone_skeleton() -> Skeleton {
        Skeleton::new(vec![Bone {
            name: "root".to_string(),
            parent: None,
            local_bind: Transform::identity(),
        }])
        .unwrap()
    }

    fn slide_clip() -> Arc<AnimationClip> {
        Arc::new(AnimationClip {
            name: "slide".to_string(),
            duration: 2.0,
            tracks: vec![BoneTrack {
                bone: 0,
                keyframes: vec![
                    Keyframe {
                        time: 0.0,
                        translation: Vec3::zeros(),
                        rotation: Quat::identity(),
                    },
                    Keyframe {
                        time: 2.0,
                        translation: Vec3::new(4.0, 0.0, 0.0),
                        rotation: Quat::identity(),
                    },
                ],
            }],
        })
    }

    #[test]
    fn test_sample_interpolates_translation() {
        let skeleton = single_bone_skeleton();
        let mut anim = ActiveAnimation::new(slide_clip(), false);

        anim.advance(1.0);
        let pose = anim.sample_pose(&skeleton);
        assert_relative_eq!(pose[0].position.x, 2.0);
    }

    #[test]
    fn test_non_looping_clamps_and_finishes() {
        let skeleton = single_bone_skeleton();
        let mut anim = ActiveAnimation::new(slide_clip(), false);

        anim.advance(5.0);
        assert!(anim.finished());
        let pose = anim.sample_pose(&skeleton);
        assert_relative_eq!(pose[0].position.x, 4.0);
    }

    #[test]
    fn test_looping_wraps_time() {
        let mut anim = ActiveAnimation::new(slide_clip(), true);

        anim.advance(2.5);
        assert!(!anim.finished());
        assert_relative_eq!(anim.time(), 0.5);
    }

    #[test]
    fn test_rotation_slerp_midpoint() {
        let skeleton = single_bone_skeleton();
        let quarter = Quat::from_axis_angle(&Vec3::y_axis(), std::f32::consts::FRAC_PI_2);
        let clip = Arc::new(AnimationClip {
            name: "turn".to_string(),
            duration: 1.0,
            tracks: vec![BoneTrack {
                bone: 0,
                keyframes: vec![
                    Keyframe {
                        time: 0.0,
                        translation: Vec3::zeros(),
                        rotation: Quat::identity(),
                    },
                    Keyframe {
                        time: 1.0,
                        translation: Vec3::zeros(),
                        rotation: quarter,
                    },
                ],
            }],
        });

        let mut anim = ActiveAnimation::new(clip, false);
        anim.advance(0.5);
        let pose = anim.sample_pose(&skeleton);

        let expected = Quat::from_axis_angle(&Vec3::y_axis(), std::f32::consts::FRAC_PI_4);
        assert_relative_eq!(pose[0].rotation.angle_to(&expected), 0.0, epsilon = 1e-4);
    }
}
