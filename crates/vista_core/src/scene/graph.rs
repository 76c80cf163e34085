//! The scene graph
//!
//! Owns every object, drives transform inheritance, keeps the spatial index
//! in sync, and performs per-frame visibility collection. Following Game
//! Engine Architecture Chapter 11.2.7 - Scene Graphs.

use std::collections::HashMap;

use slotmap::SlotMap;

use crate::config::SceneConfig;
use crate::draw::{DrawEntry, DrawQueue};
use crate::foundation::math::{Mat4, Transform, Vec3};
use crate::render::{LightingEnvironment, TechniqueRegistry};
use crate::scene::camera::Camera;
use crate::scene::object::{EntityKind, ObjectDesc, ObjectKey, SceneObject};
use crate::scene::template::{ModelProvider, ModelTemplate};
use crate::scene::SceneError;
use crate::spatial::{Aabb, Octree, OctreeConfig, SpatialIndex};
use crate::update::UpdateList;

/// Counters from one visibility collection pass
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectStats {
    /// Candidates returned by the spatial index
    pub considered: usize,
    /// Candidates rejected by the exact frustum or mask tests
    pub culled: usize,
    /// Entries pushed into the draw queue
    pub drawn: usize,
    /// Entries dropped because their technique has no GPU resource
    pub dropped: usize,
}

/// The scene: object hierarchy plus spatial registration
///
/// The scene is the sole writer of object transforms and the sole caller of
/// [`SpatialIndex::update`], so index bounds can never go stale between a
/// transform flush and the frame's queries.
pub struct Scene {
    objects: SlotMap<ObjectKey, SceneObject>,
    roots: Vec<ObjectKey>,
    names: HashMap<String, ObjectKey>,
    light_keys: Vec<ObjectKey>,
    index: Box<dyn SpatialIndex>,
    updates: UpdateList,
    pending_models: Vec<(ObjectKey, String)>,
    ambient_color: Vec3,
    ambient_intensity: f32,
    query_buffer: Vec<ObjectKey>,
}

impl Scene {
    /// Create an empty scene backed by an octree
    pub fn new(config: &SceneConfig, octree: &OctreeConfig) -> Self {
        let world = Aabb::from_center_extents(Vec3::zeros(), Vec3::repeat(config.world_extent));
        Self::with_index(config, Box::new(Octree::new(world, octree.clone())))
    }

    /// Create a scene with a custom spatial index implementation
    pub fn with_index(config: &SceneConfig, index: Box<dyn SpatialIndex>) -> Self {
        Self {
            objects: SlotMap::with_key(),
            roots: Vec::new(),
            names: HashMap::new(),
            light_keys: Vec::new(),
            index,
            updates: UpdateList::new(),
            pending_models: Vec::new(),
            ambient_color: config.ambient_color,
            ambient_intensity: config.ambient_intensity,
            query_buffer: Vec::new(),
        }
    }

    /// Number of live objects
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Set the ambient lighting term
    pub fn set_ambient(&mut self, color: Vec3, intensity: f32) {
        self.ambient_color = color;
        self.ambient_intensity = intensity;
    }

    /// Add a top-level object
    pub fn add_object(&mut self, desc: ObjectDesc) -> Result<ObjectKey, SceneError> {
        let key = self.spawn(desc, None, Mat4::identity())?;
        self.roots.push(key);
        Ok(key)
    }

    /// Add an object parented to an existing one
    ///
    /// The child's transform is interpreted relative to the parent.
    pub fn add_child(&mut self, parent: ObjectKey, desc: ObjectDesc) -> Result<ObjectKey, SceneError> {
        let parent_world = *self
            .objects
            .get(parent)
            .ok_or(SceneError::UnknownObject)?
            .world_matrix();
        let key = self.spawn(desc, Some(parent), parent_world)?;
        self.objects[parent].children.push(key);
        Ok(key)
    }

    /// Instance an object from a shared model template
    ///
    /// If the template is still streaming, the object is created around a
    /// placeholder and swapped transparently by [`Scene::resolve_pending`].
    pub fn instantiate(
        &mut self,
        provider: &mut dyn ModelProvider,
        model_id: &str,
        mut desc: ObjectDesc,
    ) -> Result<ObjectKey, SceneError> {
        match provider.resolve_model(model_id) {
            Ok(template) => {
                desc.local_bounds = template.local_bounds;
                desc.technique = template.technique;
                let key = self.add_object(desc)?;
                self.objects[key].template = Some(template);
                Ok(key)
            }
            Err(SceneError::TemplateNotReady(_)) => {
                let placeholder = ModelTemplate::placeholder(model_id);
                desc.local_bounds = placeholder.local_bounds;
                let key = self.add_object(desc)?;
                self.objects[key].template = Some(std::sync::Arc::new(placeholder));
                self.pending_models.push((key, model_id.to_string()));
                log::debug!("model `{model_id}` not ready; instanced placeholder");
                Ok(key)
            }
            Err(e) => Err(e),
        }
    }

    /// Retry templates that were not ready when their objects were instanced
    ///
    /// Called at a frame boundary; ready templates are swapped in place and
    /// the object's bounds refresh on the next transform flush.
    pub fn resolve_pending(&mut self, provider: &mut dyn ModelProvider) {
        let pending = std::mem::take(&mut self.pending_models);
        for (key, id) in pending {
            if !self.objects.contains_key(key) {
                continue;
            }
            match provider.resolve_model(&id) {
                Ok(template) => {
                    let obj = &mut self.objects[key];
                    obj.local_bounds = template.local_bounds;
                    obj.technique = template.technique;
                    obj.template = Some(template);
                    obj.transform_dirty = true;
                    log::debug!("model `{id}` resolved; placeholder swapped");
                }
                Err(SceneError::TemplateNotReady(_)) => self.pending_models.push((key, id)),
                Err(e) => log::error!("model `{id}` failed to resolve: {e}"),
            }
        }
    }

    /// Remove an object and, transitively, all of its children
    ///
    /// Detach children first to keep them alive.
    pub fn remove_object(&mut self, key: ObjectKey) -> Result<(), SceneError> {
        if !self.objects.contains_key(key) {
            return Err(SceneError::UnknownObject);
        }

        // Unlink from the parent or the root list
        match self.objects[key].parent {
            Some(parent) => {
                if let Some(obj) = self.objects.get_mut(parent) {
                    obj.children.retain(|&c| c != key);
                }
            }
            None => self.roots.retain(|&r| r != key),
        }

        // Collect the whole subtree, then drop each object
        let mut doomed = vec![key];
        let mut cursor = 0;
        while cursor < doomed.len() {
            let current = doomed[cursor];
            cursor += 1;
            if let Some(obj) = self.objects.get(current) {
                doomed.extend_from_slice(&obj.children);
            }
        }

        for key in doomed {
            if let Some(obj) = self.objects.remove(key) {
                if self.index.remove(key).is_err() {
                    log::warn!("object {key:?} was not tracked by the spatial index");
                }
                if let Some(name) = &obj.name {
                    if self.names.get(name) == Some(&key) {
                        self.names.remove(name);
                    }
                }
                self.updates.remove(key);
                self.light_keys.retain(|&l| l != key);
            }
        }

        Ok(())
    }

    /// Detach an object from its parent, making it a root
    pub fn detach(&mut self, key: ObjectKey) -> Result<(), SceneError> {
        let parent = self
            .objects
            .get(key)
            .ok_or(SceneError::UnknownObject)?
            .parent;
        let Some(parent) = parent else {
            return Ok(());
        };

        if let Some(obj) = self.objects.get_mut(parent) {
            obj.children.retain(|&c| c != key);
        }
        self.objects[key].parent = None;
        self.objects[key].transform_dirty = true;
        self.roots.push(key);
        Ok(())
    }

    /// Reparent an object under another
    pub fn set_parent(&mut self, child: ObjectKey, parent: ObjectKey) -> Result<(), SceneError> {
        if !self.objects.contains_key(child) || !self.objects.contains_key(parent) {
            return Err(SceneError::UnknownObject);
        }

        // Walking up from the new parent must never reach the child
        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == child {
                return Err(SceneError::HierarchyCycle);
            }
            cursor = self.objects[current].parent;
        }

        self.detach(child)?;
        self.roots.retain(|&r| r != child);
        self.objects[child].parent = Some(parent);
        self.objects[parent].children.push(child);
        self.objects[child].transform_dirty = true;
        Ok(())
    }

    /// Look up an object by name
    pub fn find_object(&self, name: &str) -> Option<ObjectKey> {
        self.names.get(name).copied()
    }

    /// Build a camera from a camera-anchor object
    ///
    /// Pose comes from the object's world transform (eye at the translation,
    /// looking along the local +Z basis); projection parameters come from the
    /// [`EntityKind::Camera`] variant. Returns None for non-camera objects.
    pub fn camera_at(&self, key: ObjectKey) -> Option<Camera> {
        let obj = self.objects.get(key)?;
        let EntityKind::Camera(projection) = &obj.kind else {
            return None;
        };

        let world = obj.world;
        let eye = obj.world_position();
        let forward = Vec3::new(world[(0, 2)], world[(1, 2)], world[(2, 2)]);
        let up = Vec3::new(world[(0, 1)], world[(1, 1)], world[(2, 1)]);

        let mut camera = Camera::perspective(
            projection.fov_y,
            projection.aspect,
            projection.near,
            projection.far,
        );
        camera.mask = obj.mask;
        camera.set_pose(eye, eye + forward, up);
        camera.refresh();
        Some(camera)
    }

    /// Borrow an object
    pub fn object(&self, key: ObjectKey) -> Option<&SceneObject> {
        self.objects.get(key)
    }

    /// Mutable access to an object's variant state
    ///
    /// Transforms are deliberately not reachable this way; use
    /// [`Scene::set_local_transform`] so bounds propagation stays intact.
    pub fn kind_mut(&mut self, key: ObjectKey) -> Option<&mut EntityKind> {
        self.objects.get_mut(key).map(|o| &mut o.kind)
    }

    /// Replace an object's local transform
    ///
    /// The whole subtree is marked dirty; world transforms and index bounds
    /// refresh on the next [`Scene::flush_transforms`].
    pub fn set_local_transform(&mut self, key: ObjectKey, transform: Transform) -> Result<(), SceneError> {
        let obj = self.objects.get_mut(key).ok_or(SceneError::UnknownObject)?;
        obj.local = transform;
        obj.transform_dirty = true;
        Ok(())
    }

    /// Show or hide an object
    pub fn set_visible(&mut self, key: ObjectKey, visible: bool) -> Result<(), SceneError> {
        let obj = self.objects.get_mut(key).ok_or(SceneError::UnknownObject)?;
        obj.visible = visible;
        Ok(())
    }

    /// Advance time-driven state for every registered object
    ///
    /// Runs strictly before visibility collection. Update order among
    /// independent objects is unspecified.
    pub fn update(&mut self, dt: f32) {
        for i in 0..self.updates.len() {
            let Some(key) = self.updates.get(i) else { break };
            if let Some(obj) = self.objects.get_mut(key) {
                obj.kind.update(dt);
            }
        }
    }

    /// Recompute dirty world transforms top-down and push bounds to the index
    pub fn flush_transforms(&mut self) {
        for i in 0..self.roots.len() {
            let root = self.roots[i];
            self.propagate(root, Mat4::identity(), false);
        }
    }

    fn propagate(&mut self, key: ObjectKey, parent_world: Mat4, parent_dirty: bool) {
        let Some(obj) = self.objects.get_mut(key) else {
            return;
        };

        let dirty = parent_dirty || obj.transform_dirty;
        if dirty {
            obj.world = parent_world * obj.local.to_matrix();
            obj.world_bounds = obj.local_bounds.transformed(&obj.world);
            obj.transform_dirty = false;

            let bounds = obj.world_bounds;
            if let Err(e) = self.index.update(key, bounds) {
                // Degenerate bounds (e.g. zero scale): skip this object for
                // the frame rather than aborting the flush
                log::warn!("bounds update for {key:?} rejected: {e}");
            }
        }

        let world = self.objects[key].world;
        let mut i = 0;
        loop {
            let child = match self.objects.get(key) {
                Some(obj) => obj.children.get(i).copied(),
                None => None,
            };
            let Some(child) = child else { break };
            self.propagate(child, world, dirty);
            i += 1;
        }
    }

    /// Collect visible draw entries and active lights for this frame
    ///
    /// Runs the spatial query, applies the exact frustum and layer-mask
    /// tests, resolves techniques against the registry, and leaves `queue`
    /// sorted per the phase policies. Entries whose technique has no GPU
    /// resource are dropped and counted, never fatal.
    pub fn collect_visible(
        &mut self,
        camera: &Camera,
        queue: &mut DrawQueue,
        registry: &TechniqueRegistry,
        lights: &mut LightingEnvironment,
    ) -> CollectStats {
        let mut stats = CollectStats::default();

        lights.clear();
        lights.ambient_color = self.ambient_color;
        lights.ambient_intensity = self.ambient_intensity;

        // Lights are gathered from their own registry: directional lights
        // are unbounded, so the spatial query cannot be their source.
        for i in 0..self.light_keys.len() {
            let key = self.light_keys[i];
            let Some(obj) = self.objects.get(key) else { continue };
            if !obj.visible || !obj.mask.intersects(camera.mask) {
                continue;
            }
            if let EntityKind::Light(light) = &obj.kind {
                let mut light = light.clone();
                light.position = obj.world_position();
                if let Some(bounds) = light.bounds() {
                    if !camera.frustum().intersects_aabb(&bounds) {
                        continue;
                    }
                }
                lights.lights.push(light);
            }
        }

        let mut buffer = std::mem::take(&mut self.query_buffer);
        buffer.clear();
        self.index.query_frustum(camera.frustum(), &mut buffer);
        stats.considered = buffer.len();

        for &key in &buffer {
            let Some(obj) = self.objects.get(key) else { continue };
            if !obj.kind.drawable() {
                continue;
            }
            if !obj.visible || !obj.mask.intersects(camera.mask) {
                stats.culled += 1;
                continue;
            }
            // The index may return coarse supersets; re-test exactly
            if !camera.frustum().intersects_aabb(&obj.world_bounds) {
                stats.culled += 1;
                continue;
            }

            let distance = (obj.world_position() - camera.position()).magnitude();
            match registry.order_of(obj.technique) {
                Some(order) => {
                    queue.push(
                        DrawEntry {
                            object: key,
                            transform: obj.world,
                            technique: obj.technique,
                            phase: obj.phase,
                            distance,
                        },
                        order,
                    );
                    stats.drawn += 1;
                }
                None => {
                    stats.dropped += 1;
                    log::warn!(
                        "object {key:?} uses unregistered technique {:?}; entry dropped",
                        obj.technique
                    );
                }
            }
        }

        self.query_buffer = buffer;
        queue.sort();
        stats
    }

    fn spawn(
        &mut self,
        desc: ObjectDesc,
        parent: Option<ObjectKey>,
        parent_world: Mat4,
    ) -> Result<ObjectKey, SceneError> {
        let world = parent_world * desc.transform.to_matrix();
        let world_bounds = desc.local_bounds.transformed(&world);

        let needs_update = desc.kind.needs_update();
        let is_light = matches!(desc.kind, EntityKind::Light(_));
        let name = desc.name.clone();

        let key = self.objects.insert(SceneObject {
            name: desc.name,
            kind: desc.kind,
            local: desc.transform,
            world,
            local_bounds: desc.local_bounds,
            world_bounds,
            parent,
            children: Vec::new(),
            technique: desc.technique,
            phase: desc.phase,
            mask: desc.mask,
            visible: desc.visible,
            template: None,
            transform_dirty: false,
        });

        // Degenerate bounds are rejected here, before the object is visible
        // to any query
        if let Err(e) = self.index.insert(key, world_bounds) {
            self.objects.remove(key);
            return Err(e.into());
        }

        if let Some(name) = name {
            if let Some(previous) = self.names.insert(name.clone(), key) {
                log::warn!("object name `{name}` reused; lookup now resolves to the newer object ({previous:?} shadowed)");
            }
        }
        if needs_update {
            self.updates.add(key);
        }
        if is_light {
            self.light_keys.push(key);
        }

        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::DrawPhase;
    use crate::render::{
        BlendMode, BufferHandle, ClearValue, DrawBatch, GraphicsDevice, RenderError, TargetDesc,
        TargetHandle, TechniqueDesc, TechniqueHandle, TechniqueId, TextureDesc, TextureHandle,
    };
    use approx::assert_relative_eq;

    #[derive(Default)]
    struct StubDevice {
        next: u64,
    }

    impl GraphicsDevice for StubDevice {
        fn create_texture(&mut self, _: &TextureDesc) -> Result<TextureHandle, RenderError> {
            Ok(TextureHandle(0))
        }

        fn create_render_target(&mut self, _: &TargetDesc) -> Result<TargetHandle, RenderError> {
            Ok(TargetHandle(0))
        }

        fn destroy_render_target(&mut self, _: TargetHandle) {}

        fn compile_technique(&mut self, _: &TechniqueDesc) -> Result<TechniqueHandle, RenderError> {
            self.next += 1;
            Ok(TechniqueHandle(self.next))
        }

        fn create_vertex_buffer(&mut self, _: &[u8]) -> Result<BufferHandle, RenderError> {
            Ok(BufferHandle(0))
        }

        fn clear_target(&mut self, _: TargetHandle, _: &ClearValue) -> Result<(), RenderError> {
            Ok(())
        }

        fn draw(&mut self, _: &DrawBatch) -> Result<(), RenderError> {
            Ok(())
        }
    }

    fn test_scene() -> Scene {
        Scene::new(&SceneConfig::default(), &OctreeConfig::default())
    }

    fn registry_with(ids: &[TechniqueId]) -> TechniqueRegistry {
        let mut device = StubDevice::default();
        let mut registry = TechniqueRegistry::new();
        for id in ids {
            registry
                .register(
                    *id,
                    &mut device,
                    &TechniqueDesc {
                        name: format!("tech{}", id.0),
                        blend: BlendMode::Opaque,
                        depth_test: true,
                    },
                )
                .unwrap();
        }
        registry
    }

    fn prop_at(position: Vec3, name: Option<&str>) -> ObjectDesc {
        ObjectDesc {
            name: name.map(str::to_string),
            transform: Transform::from_position(position),
            ..Default::default()
        }
    }

    #[test]
    fn test_add_and_find_by_name() {
        let mut scene = test_scene();
        let key = scene
            .add_object(prop_at(Vec3::new(1.0, 0.0, 0.0), Some("crate")))
            .unwrap();

        assert_eq!(scene.find_object("crate"), Some(key));
        assert_eq!(scene.find_object("barrel"), None);
        assert_eq!(scene.object_count(), 1);
    }

    #[test]
    fn test_child_inherits_parent_transform() {
        let mut scene = test_scene();
        let parent = scene.add_object(prop_at(Vec3::new(10.0, 0.0, 0.0), None)).unwrap();
        let child = scene
            .add_child(parent, prop_at(Vec3::new(0.0, 5.0, 0.0), None))
            .unwrap();

        scene.flush_transforms();

        let pos = scene.object(child).unwrap().world_position();
        assert_relative_eq!(pos.x, 10.0);
        assert_relative_eq!(pos.y, 5.0);
    }

    #[test]
    fn test_moving_parent_moves_child_bounds() {
        let mut scene = test_scene();
        let parent = scene.add_object(prop_at(Vec3::zeros(), None)).unwrap();
        let child = scene
            .add_child(parent, prop_at(Vec3::new(0.0, 2.0, 0.0), None))
            .unwrap();
        scene.flush_transforms();

        scene
            .set_local_transform(parent, Transform::from_position(Vec3::new(50.0, 0.0, 0.0)))
            .unwrap();
        scene.flush_transforms();

        let bounds = *scene.object(child).unwrap().world_bounds();
        assert!(bounds.contains_point(Vec3::new(50.0, 2.0, 0.0)));
    }

    #[test]
    fn test_remove_destroys_children_transitively() {
        let mut scene = test_scene();
        let parent = scene.add_object(prop_at(Vec3::zeros(), None)).unwrap();
        let child = scene
            .add_child(parent, prop_at(Vec3::new(1.0, 0.0, 0.0), Some("kid")))
            .unwrap();

        scene.remove_object(parent).unwrap();
        assert_eq!(scene.object_count(), 0);
        assert!(scene.object(child).is_none());
        assert_eq!(scene.find_object("kid"), None);
    }

    #[test]
    fn test_detached_child_survives_parent_removal() {
        let mut scene = test_scene();
        let parent = scene.add_object(prop_at(Vec3::zeros(), None)).unwrap();
        let child = scene
            .add_child(parent, prop_at(Vec3::new(1.0, 0.0, 0.0), None))
            .unwrap();

        scene.detach(child).unwrap();
        scene.remove_object(parent).unwrap();

        assert_eq!(scene.object_count(), 1);
        assert!(scene.object(child).is_some());
    }

    #[test]
    fn test_reparent_cycle_is_rejected() {
        let mut scene = test_scene();
        let a = scene.add_object(prop_at(Vec3::zeros(), None)).unwrap();
        let b = scene.add_child(a, prop_at(Vec3::new(1.0, 0.0, 0.0), None)).unwrap();

        assert_eq!(scene.set_parent(a, b), Err(SceneError::HierarchyCycle));
    }

    #[test]
    fn test_degenerate_bounds_rejected_on_add() {
        let mut scene = test_scene();
        let desc = ObjectDesc {
            local_bounds: Aabb::new(Vec3::new(1.0, 1.0, 1.0), Vec3::zeros()),
            ..Default::default()
        };

        assert!(matches!(scene.add_object(desc), Err(SceneError::Spatial(_))));
        assert_eq!(scene.object_count(), 0);
    }

    #[test]
    fn test_collect_visible_culls_and_batches() {
        let mut scene = test_scene();
        let registry = registry_with(&[TechniqueId(0)]);

        scene.add_object(prop_at(Vec3::new(0.0, 0.0, 10.0), None)).unwrap();
        scene.add_object(prop_at(Vec3::new(0.0, 0.0, 20.0), None)).unwrap();
        // Behind the camera
        scene.add_object(prop_at(Vec3::new(0.0, 0.0, -30.0), None)).unwrap();

        scene.flush_transforms();

        let mut camera = Camera::perspective(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0);
        camera.refresh();

        let mut queue = DrawQueue::new();
        let mut lights = LightingEnvironment::new();
        let stats = scene.collect_visible(&camera, &mut queue, &registry, &mut lights);

        assert_eq!(stats.drawn, 2);
        assert_eq!(queue.layer(DrawPhase::Opaque).entry_count(), 2);

        // Front-to-back within the group
        let entries = &queue.layer(DrawPhase::Opaque).groups()[0].entries;
        assert!(entries[0].distance <= entries[1].distance);
    }

    #[test]
    fn test_unregistered_technique_drops_entry() {
        let mut scene = test_scene();
        let registry = registry_with(&[]);

        scene.add_object(prop_at(Vec3::new(0.0, 0.0, 10.0), None)).unwrap();
        scene.flush_transforms();

        let camera = Camera::perspective(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0);
        let mut queue = DrawQueue::new();
        let mut lights = LightingEnvironment::new();
        let stats = scene.collect_visible(&camera, &mut queue, &registry, &mut lights);

        assert_eq!(stats.dropped, 1);
        assert_eq!(queue.entry_count(), 0);
    }

    #[test]
    fn test_invisible_objects_are_skipped() {
        let mut scene = test_scene();
        let registry = registry_with(&[TechniqueId(0)]);

        let key = scene.add_object(prop_at(Vec3::new(0.0, 0.0, 10.0), None)).unwrap();
        scene.set_visible(key, false).unwrap();
        scene.flush_transforms();

        let camera = Camera::perspective(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0);
        let mut queue = DrawQueue::new();
        let mut lights = LightingEnvironment::new();
        let stats = scene.collect_visible(&camera, &mut queue, &registry, &mut lights);

        assert_eq!(stats.drawn, 0);
        assert_eq!(stats.culled, 1);
    }

    #[test]
    fn test_placeholder_swaps_when_model_ready() {
        use crate::scene::template::{ModelProvider, ModelTemplate};
        use std::sync::Arc;

        struct StubProvider {
            ready: bool,
        }

        impl ModelProvider for StubProvider {
            fn resolve_model(&mut self, id: &str) -> Result<Arc<ModelTemplate>, SceneError> {
                if self.ready {
                    Ok(Arc::new(ModelTemplate {
                        name: id.to_string(),
                        local_bounds: Aabb::from_center_extents(
                            Vec3::zeros(),
                            Vec3::new(2.0, 2.0, 2.0),
                        ),
                        technique: TechniqueId(7),
                        vertex_buffer: None,
                        placeholder: false,
                    }))
                } else {
                    Err(SceneError::TemplateNotReady(id.to_string()))
                }
            }
        }

        let mut scene = test_scene();
        let mut provider = StubProvider { ready: false };

        let key = scene
            .instantiate(&mut provider, "rock", ObjectDesc::default())
            .unwrap();
        assert!(scene.object(key).unwrap().template().unwrap().placeholder);

        // Still streaming: the placeholder stays
        scene.resolve_pending(&mut provider);
        assert!(scene.object(key).unwrap().template().unwrap().placeholder);

        provider.ready = true;
        scene.resolve_pending(&mut provider);
        scene.flush_transforms();

        let obj = scene.object(key).unwrap();
        assert!(!obj.template().unwrap().placeholder);
        assert_eq!(obj.technique, TechniqueId(7));
        assert!(obj.world_bounds().contains_point(Vec3::new(1.9, 0.0, 0.0)));
    }

    #[test]
    fn test_camera_anchor_object() {
        let mut scene = test_scene();
        let key = scene
            .add_object(ObjectDesc {
                kind: EntityKind::Camera(crate::scene::Projection::default()),
                transform: Transform::from_position(Vec3::new(0.0, 5.0, -20.0)),
                ..Default::default()
            })
            .unwrap();
        scene.flush_transforms();

        let camera = scene.camera_at(key).expect("camera anchor");
        assert_relative_eq!(camera.position().y, 5.0);

        let prop = scene.add_object(prop_at(Vec3::zeros(), None)).unwrap();
        assert!(scene.camera_at(prop).is_none());
    }

    #[test]
    fn test_lights_follow_object_transform() {
        use crate::render::Light;

        let mut scene = test_scene();
        let registry = registry_with(&[]);

        let key = scene
            .add_object(ObjectDesc {
                kind: EntityKind::Light(Light::point(
                    Vec3::zeros(),
                    Vec3::new(1.0, 1.0, 1.0),
                    2.0,
                    15.0,
                )),
                transform: Transform::from_position(Vec3::new(0.0, 4.0, 10.0)),
                ..Default::default()
            })
            .unwrap();
        scene.flush_transforms();

        let camera = Camera::perspective(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0);
        let mut queue = DrawQueue::new();
        let mut lights = LightingEnvironment::new();
        scene.collect_visible(&camera, &mut queue, &registry, &mut lights);

        assert_eq!(lights.len(), 1);
        assert_relative_eq!(lights.lights[0].position.y, 4.0);

        // Hidden lights stop contributing
        scene.set_visible(key, false).unwrap();
        scene.collect_visible(&camera, &mut queue, &registry, &mut lights);
        assert!(lights.is_empty());
    }
}
