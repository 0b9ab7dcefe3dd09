//! Scheduling: canvas resolution, duration allocation and the slot timeline.

/// Duration Allocator and fade clamping.
pub mod alloc;
/// Canvas Resolver.
pub mod canvas;
/// Slots and the validated timeline.
pub mod plan;
