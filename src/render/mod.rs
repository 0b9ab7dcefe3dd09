//! Slide rendering: one normalized clip per slot, fanned out over a worker pool.

/// Bounded worker pool for per-slot rendering.
pub mod pool;
/// Slide Renderer (still-image and pre-rendered clip branches).
pub mod slide;
