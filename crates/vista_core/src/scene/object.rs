//! Scene objects and entity variants
//!
//! A closed set of entity variants (static prop, animated model, particle
//! emitter, light, camera) shares one object record; variant-specific state
//! lives in [`EntityKind`] and is dispatched through plain `update`/collect
//! methods rather than a virtual hierarchy.

use std::sync::Arc;

use bitflags::bitflags;
use slotmap::new_key_type;

use crate::draw::DrawPhase;
use crate::foundation::math::{Mat4, Transform, Vec3};
use crate::render::{Light, TechniqueId};
use crate::scene::camera::Projection;
use crate::scene::template::ModelTemplate;
use crate::spatial::Aabb;
use crate::update::{ActiveAnimation, AnimationClip, Skeleton};

new_key_type! {
    /// Stable handle to a scene object
    ///
    /// Keys stay valid until the object is removed; a removed key never
    /// aliases a new object.
    pub struct ObjectKey;
}

bitflags! {
    /// Visibility layer mask
    ///
    /// An object is considered by a camera when the two masks intersect.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LayerMask: u32 {
        /// Default world layer
        const DEFAULT = 1;
        /// Background scenery
        const SCENERY = 1 << 1;
        /// Gameplay effects
        const EFFECTS = 1 << 2;
        /// Debug-only visuals
        const DEBUG = 1 << 3;
        /// Every layer
        const ALL = u32::MAX;
    }
}

/// Skinned model state for [`EntityKind::AnimatedModel`]
#[derive(Debug, Clone)]
pub struct AnimatedModel {
    /// Bone hierarchy in bind pose
    pub skeleton: Skeleton,
    /// Currently playing clip, if any
    pub animation: Option<ActiveAnimation>,
    pose: Vec<Mat4>,
}

impl AnimatedModel {
    /// Create a model resting in its bind pose
    pub fn new(skeleton: Skeleton) -> Self {
        let pose = skeleton.world_poses(&skeleton.bind_pose());
        Self {
            skeleton,
            animation: None,
            pose,
        }
    }

    /// Start playing a clip from the beginning
    pub fn play(&mut self, clip: Arc<AnimationClip>, looping: bool) {
        self.animation = Some(ActiveAnimation::new(clip, looping));
    }

    /// World-space bone matrices from the most recent update
    pub fn pose(&self) -> &[Mat4] {
        &self.pose
    }

    fn update(&mut self, dt: f32) {
        // Bone -> pose ordering is internal to this update; the scheduler
        // guarantees nothing across objects.
        if let Some(animation) = &mut self.animation {
            animation.advance(dt);
            let locals = animation.sample_pose(&self.skeleton);
            self.pose = self.skeleton.world_poses(&locals);
        }
    }
}

/// Particle emitter state for [`EntityKind::ParticleEmitter`]
#[derive(Debug, Clone)]
pub struct ParticleEmitter {
    /// Particles spawned per second
    pub spawn_rate: f32,
    /// Lifetime of each particle in seconds
    pub particle_lifetime: f32,
    /// Hard cap on live particles
    pub max_particles: usize,
    accumulator: f32,
    ages: Vec<f32>,
}

impl ParticleEmitter {
    /// Create an emitter with the given spawn parameters
    pub fn new(spawn_rate: f32, particle_lifetime: f32, max_particles: usize) -> Self {
        Self {
            spawn_rate,
            particle_lifetime,
            max_particles,
            accumulator: 0.0,
            ages: Vec::new(),
        }
    }

    /// Number of live particles
    pub fn alive(&self) -> usize {
        self.ages.len()
    }

    fn update(&mut self, dt: f32) {
        for age in &mut self.ages {
            *age += dt;
        }
        self.ages.retain(|age| *age < self.particle_lifetime);

        self.accumulator += self.spawn_rate * dt;
        while self.accumulator >= 1.0 && self.ages.len() < self.max_particles {
            self.accumulator -= 1.0;
            self.ages.push(0.0);
        }
        // Don't bank spawn debt while saturated
        if self.ages.len() >= self.max_particles {
            self.accumulator = self.accumulator.min(1.0);
        }
    }
}

/// Variant-specific state of a scene object
#[derive(Debug, Clone)]
pub enum EntityKind {
    /// Static scenery with no per-frame state
    StaticProp,
    /// Skinned model driven by animation clips
    AnimatedModel(AnimatedModel),
    /// Particle emitter
    ParticleEmitter(ParticleEmitter),
    /// Light source anchored to the object's transform
    Light(Light),
    /// Camera anchor carrying projection parameters
    Camera(Projection),
}

impl EntityKind {
    /// Advance time-driven state by the shared frame delta
    pub(crate) fn update(&mut self, dt: f32) {
        match self {
            EntityKind::AnimatedModel(model) => model.update(dt),
            EntityKind::ParticleEmitter(emitter) => emitter.update(dt),
            EntityKind::StaticProp | EntityKind::Light(_) | EntityKind::Camera(_) => {}
        }
    }

    /// Whether this variant needs a per-frame update
    pub(crate) fn needs_update(&self) -> bool {
        matches!(self, EntityKind::AnimatedModel(_) | EntityKind::ParticleEmitter(_))
    }

    /// Whether this variant produces draw entries
    pub(crate) fn drawable(&self) -> bool {
        matches!(
            self,
            EntityKind::StaticProp | EntityKind::AnimatedModel(_) | EntityKind::ParticleEmitter(_)
        )
    }
}

/// Description of an object to add to the scene
#[derive(Debug, Clone)]
pub struct ObjectDesc {
    /// Optional name for [`crate::scene::Scene::find_object`]
    pub name: Option<String>,
    /// Variant-specific state
    pub kind: EntityKind,
    /// Local transform relative to the parent (world for roots)
    pub transform: Transform,
    /// Model-space bounds
    pub local_bounds: Aabb,
    /// Technique tag resolved through the technique registry
    pub technique: TechniqueId,
    /// Rendering phase of this object's draw entries
    pub phase: DrawPhase,
    /// Visibility layer mask
    pub mask: LayerMask,
    /// Initial visibility flag
    pub visible: bool,
}

impl Default for ObjectDesc {
    fn default() -> Self {
        Self {
            name: None,
            kind: EntityKind::StaticProp,
            transform: Transform::identity(),
            local_bounds: Aabb::from_center_extents(Vec3::zeros(), Vec3::new(0.5, 0.5, 0.5)),
            technique: TechniqueId(0),
            phase: DrawPhase::Opaque,
            mask: LayerMask::DEFAULT,
            visible: true,
        }
    }
}

/// One object in the scene
///
/// Owned exclusively by the [`crate::scene::Scene`]; transforms are written
/// only through scene methods so the spatial index always sees fresh bounds.
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub(crate) name: Option<String>,
    pub(crate) kind: EntityKind,
    pub(crate) local: Transform,
    pub(crate) world: Mat4,
    pub(crate) local_bounds: Aabb,
    pub(crate) world_bounds: Aabb,
    pub(crate) parent: Option<ObjectKey>,
    pub(crate) children: Vec<ObjectKey>,
    pub(crate) technique: TechniqueId,
    pub(crate) phase: DrawPhase,
    pub(crate) mask: LayerMask,
    pub(crate) visible: bool,
    pub(crate) template: Option<Arc<ModelTemplate>>,
    pub(crate) transform_dirty: bool,
}

impl SceneObject {
    /// Object name, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Variant-specific state
    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    /// Local transform relative to the parent
    pub fn local_transform(&self) -> &Transform {
        &self.local
    }

    /// World matrix from the most recent transform flush
    pub fn world_matrix(&self) -> &Mat4 {
        &self.world
    }

    /// World position from the most recent transform flush
    pub fn world_position(&self) -> Vec3 {
        Vec3::new(self.world[(0, 3)], self.world[(1, 3)], self.world[(2, 3)])
    }

    /// World-space bounds from the most recent transform flush
    pub fn world_bounds(&self) -> &Aabb {
        &self.world_bounds
    }

    /// Parent key, None for roots
    pub fn parent(&self) -> Option<ObjectKey> {
        self.parent
    }

    /// Child keys
    pub fn children(&self) -> &[ObjectKey] {
        &self.children
    }

    /// Whether the object participates in visibility collection
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Shared model template, if this object was instanced from one
    pub fn template(&self) -> Option<&Arc<ModelTemplate>> {
        self.template.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emitter_spawns_at_rate() {
        let mut emitter = ParticleEmitter::new(10.0, 100.0, 64);
        emitter.update(1.0);
        assert_eq!(emitter.alive(), 10);
    }

    #[test]
    fn test_emitter_respects_cap() {
        let mut emitter = ParticleEmitter::new(1000.0, 100.0, 16);
        emitter.update(1.0);
        assert_eq!(emitter.alive(), 16);

        // Saturated emitters don't bank spawn debt
        emitter.update(1.0);
        assert_eq!(emitter.alive(), 16);
    }

    #[test]
    fn test_emitter_retires_old_particles() {
        let mut emitter = ParticleEmitter::new(5.0, 0.5, 64);
        emitter.update(1.0);
        assert_eq!(emitter.alive(), 5);

        emitter.update(0.6);
        // The originals aged out; only the newly spawned remain
        assert_eq!(emitter.alive(), 3);
    }

    #[test]
    fn test_layer_mask_intersection() {
        let object = LayerMask::SCENERY;
        assert!(LayerMask::ALL.intersects(object));
        assert!(!LayerMask::EFFECTS.intersects(object));
    }
}
