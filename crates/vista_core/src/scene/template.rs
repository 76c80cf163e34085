//! Shared model templates
//!
//! A [`ModelTemplate`] is the shared mesh + material resource behind any
//! number of scene objects. Templates are reference-counted (`Arc`) so the
//! resource is released deterministically when the last referencing instance
//! drops; the asset collaborator resolves them by id through
//! [`ModelProvider`].

use std::sync::Arc;

use crate::render::{BufferHandle, TechniqueId};
use crate::scene::SceneError;
use crate::spatial::Aabb;
use crate::foundation::math::Vec3;

/// Shared mesh and material data for instanced objects
#[derive(Debug, Clone)]
pub struct ModelTemplate {
    /// Template id as known to the asset system
    pub name: String,
    /// Model-space bounds used for culling instances
    pub local_bounds: Aabb,
    /// Technique instances draw with
    pub technique: TechniqueId,
    /// Backend vertex buffer, None for placeholders
    pub vertex_buffer: Option<BufferHandle>,
    /// True while this template stands in for a still-loading resource
    pub placeholder: bool,
}

impl ModelTemplate {
    /// Stand-in template used while the real resource streams in
    ///
    /// Swapped transparently once the provider reports the model ready.
    pub fn placeholder(name: &str) -> Self {
        Self {
            name: name.to_string(),
            local_bounds: Aabb::from_center_extents(Vec3::zeros(), Vec3::new(0.5, 0.5, 0.5)),
            technique: TechniqueId(0),
            vertex_buffer: None,
            placeholder: true,
        }
    }
}

/// Asset/model provider capability
///
/// Implemented by the asset-loading collaborator. Returning
/// [`SceneError::TemplateNotReady`] is not a failure: the scene instances a
/// placeholder and retries at a later frame boundary.
pub trait ModelProvider {
    /// Resolve a shared model template by id
    fn resolve_model(&mut self, id: &str) -> Result<Arc<ModelTemplate>, SceneError>;
}
