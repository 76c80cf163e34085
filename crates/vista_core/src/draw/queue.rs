//! Draw queue with material batching and sort policies
//!
//! A [`DrawQueue`] holds one [`DrawLayer`] per rendering phase. Within a
//! layer, entries sharing a technique are batched into a [`DrawGroup`];
//! groups keep the stable technique-registration order to minimize GPU state
//! switches. Entry buffers are cleared, never deallocated, so steady-state
//! frames allocate nothing.

use crate::foundation::math::Mat4;
use crate::render::TechniqueId;
use crate::scene::ObjectKey;

/// Rendering phase of a draw entry
///
/// Phases execute in declaration order every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawPhase {
    /// Opaque geometry, drawn into the geometry buffer front-to-back
    Opaque,
    /// Blended geometry, drawn forward back-to-front after lighting
    Transparent,
    /// Screen-space overlays, drawn last in submission order
    Overlay,
}

impl DrawPhase {
    /// All phases in execution order
    pub const ALL: [DrawPhase; 3] = [DrawPhase::Opaque, DrawPhase::Transparent, DrawPhase::Overlay];

    fn index(self) -> usize {
        match self {
            DrawPhase::Opaque => 0,
            DrawPhase::Transparent => 1,
            DrawPhase::Overlay => 2,
        }
    }
}

/// Ephemeral record of one renderable for the current frame
///
/// References the renderable by key, never owns it.
#[derive(Debug, Clone, Copy)]
pub struct DrawEntry {
    /// Scene object this entry was collected from
    pub object: ObjectKey,
    /// World transform snapshot taken at collection time
    pub transform: Mat4,
    /// Technique used to draw the entry
    pub technique: TechniqueId,
    /// Phase the entry belongs to
    pub phase: DrawPhase,
    /// Distance from the camera, used by the sort policies
    pub distance: f32,
}

/// Batch of entries sharing one technique
#[derive(Debug)]
pub struct DrawGroup {
    /// Technique shared by every entry in the group
    pub technique: TechniqueId,
    /// Registration order of the technique, fixes group order within a layer
    registration: usize,
    /// Entries batched into this group
    pub entries: Vec<DrawEntry>,
}

impl DrawGroup {
    /// Number of entries in this group
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the group holds no entries this frame
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Ordered sequence of groups for one rendering phase
#[derive(Debug)]
pub struct DrawLayer {
    phase: DrawPhase,
    groups: Vec<DrawGroup>,
}

impl DrawLayer {
    fn new(phase: DrawPhase) -> Self {
        Self {
            phase,
            groups: Vec::new(),
        }
    }

    /// Phase this layer renders in
    pub fn phase(&self) -> DrawPhase {
        self.phase
    }

    /// Groups in stable technique-registration order
    pub fn groups(&self) -> &[DrawGroup] {
        &self.groups
    }

    /// Total entries across all groups
    pub fn entry_count(&self) -> usize {
        self.groups.iter().map(DrawGroup::len).sum()
    }

    /// Find or create the group for a technique, keeping registration order
    fn group_mut(&mut self, technique: TechniqueId, registration: usize) -> &mut DrawGroup {
        if let Some(pos) = self.groups.iter().position(|g| g.technique == technique) {
            return &mut self.groups[pos];
        }

        let insert_at = self
            .groups
            .iter()
            .position(|g| g.registration > registration)
            .unwrap_or(self.groups.len());
        self.groups.insert(
            insert_at,
            DrawGroup {
                technique,
                registration,
                entries: Vec::new(),
            },
        );
        &mut self.groups[insert_at]
    }

    fn clear(&mut self) {
        // Groups persist so their registration order and capacity carry over
        for group in &mut self.groups {
            group.entries.clear();
        }
    }

    fn sort(&mut self) {
        match self.phase {
            // Front-to-back: early depth rejection, minimal overdraw
            DrawPhase::Opaque => {
                for group in &mut self.groups {
                    group.entries.sort_by(|a, b| a.distance.total_cmp(&b.distance));
                }
            }
            // Back-to-front: required for correct alpha compositing
            DrawPhase::Transparent => {
                for group in &mut self.groups {
                    group.entries.sort_by(|a, b| b.distance.total_cmp(&a.distance));
                }
            }
            // Overlays keep submission order
            DrawPhase::Overlay => {}
        }
    }
}

/// Per-frame draw queue covering all rendering phases
#[derive(Debug)]
pub struct DrawQueue {
    layers: [DrawLayer; 3],
}

impl Default for DrawQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self {
            layers: [
                DrawLayer::new(DrawPhase::Opaque),
                DrawLayer::new(DrawPhase::Transparent),
                DrawLayer::new(DrawPhase::Overlay),
            ],
        }
    }

    /// Add an entry to the group matching its technique and phase
    ///
    /// `registration` is the technique's registration order, which fixes the
    /// relative order of groups within the layer.
    pub fn push(&mut self, entry: DrawEntry, registration: usize) {
        self.layers[entry.phase.index()]
            .group_mut(entry.technique, registration)
            .entries
            .push(entry);
    }

    /// Apply the per-phase sort policies
    pub fn sort(&mut self) {
        for layer in &mut self.layers {
            layer.sort();
        }
    }

    /// Reset for the next frame without releasing buffers
    pub fn clear(&mut self) {
        for layer in &mut self.layers {
            layer.clear();
        }
    }

    /// Layer for a phase
    pub fn layer(&self, phase: DrawPhase) -> &DrawLayer {
        &self.layers[phase.index()]
    }

    /// Layers in execution order
    pub fn layers(&self) -> &[DrawLayer] {
        &self.layers
    }

    /// Total entries across all layers
    pub fn entry_count(&self) -> usize {
        self.layers.iter().map(DrawLayer::entry_count).sum()
    }
}
