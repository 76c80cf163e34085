//! Per-frame draw collection
//!
//! Collects visible renderables into batched, sorted queues, following Game
//! Engine Architecture Chapter 11.3 - Render Queues.

pub mod queue;

pub use queue::{DrawEntry, DrawGroup, DrawLayer, DrawPhase, DrawQueue};
