//! Technique registration
//!
//! Maps the engine-side [`TechniqueId`] tags carried by scene objects to
//! compiled backend handles. Registration order is stable and drives the
//! relative order of draw groups within a layer.

use std::collections::HashMap;

use crate::render::{GraphicsDevice, RenderError, TechniqueDesc, TechniqueHandle};

/// Identifier of a material technique as tagged on scene objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TechniqueId(pub u32);

/// Registry of compiled techniques in registration order
#[derive(Debug, Default)]
pub struct TechniqueRegistry {
    entries: Vec<(TechniqueId, TechniqueHandle)>,
    lookup: HashMap<TechniqueId, usize>,
}

impl TechniqueRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and register a technique
    ///
    /// Re-registering an existing id replaces its handle but keeps its
    /// original registration order.
    pub fn register(
        &mut self,
        id: TechniqueId,
        device: &mut dyn GraphicsDevice,
        desc: &TechniqueDesc,
    ) -> Result<TechniqueHandle, RenderError> {
        let handle = device.compile_technique(desc)?;
        match self.lookup.get(&id) {
            Some(&pos) => self.entries[pos].1 = handle,
            None => {
                self.lookup.insert(id, self.entries.len());
                self.entries.push((id, handle));
            }
        }
        log::debug!("registered technique {:?} as {:?}", id, handle);
        Ok(handle)
    }

    /// Registration order of a technique, None if unknown
    pub fn order_of(&self, id: TechniqueId) -> Option<usize> {
        self.lookup.get(&id).copied()
    }

    /// Compiled handle of a technique, None if unknown
    pub fn handle_of(&self, id: TechniqueId) -> Option<TechniqueHandle> {
        self.lookup.get(&id).map(|&pos| self.entries[pos].1)
    }

    /// Number of registered techniques
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no techniques are registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{BlendMode, ClearValue, DrawBatch, TargetDesc, TargetHandle, TextureDesc, TextureHandle, BufferHandle};

    #[derive(Default)]
    struct StubDevice {
        compiled: u64,
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
            self.compiled += 1;
            Ok(TechniqueHandle(self.compiled))
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

    fn desc(name: &str) -> TechniqueDesc {
        TechniqueDesc {
            name: name.to_string(),
            blend: BlendMode::Opaque,
            depth_test: true,
        }
    }

    #[test]
    fn test_registration_order_is_stable() {
        let mut device = StubDevice::default();
        let mut registry = TechniqueRegistry::new();

        registry.register(TechniqueId(9), &mut device, &desc("a")).unwrap();
        registry.register(TechniqueId(2), &mut device, &desc("b")).unwrap();

        assert_eq!(registry.order_of(TechniqueId(9)), Some(0));
        assert_eq!(registry.order_of(TechniqueId(2)), Some(1));
        assert_eq!(registry.order_of(TechniqueId(5)), None);
    }

    #[test]
    fn test_reregistration_keeps_order() {
        let mut device = StubDevice::default();
        let mut registry = TechniqueRegistry::new();

        registry.register(TechniqueId(1), &mut device, &desc("a")).unwrap();
        registry.register(TechniqueId(2), &mut device, &desc("b")).unwrap();
        let replaced = registry.register(TechniqueId(1), &mut device, &desc("a2")).unwrap();

        assert_eq!(registry.order_of(TechniqueId(1)), Some(0));
        assert_eq!(registry.handle_of(TechniqueId(1)), Some(replaced));
        assert_eq!(registry.len(), 2);
    }
}
