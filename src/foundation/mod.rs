//! Shared value types and the error taxonomy.

/// Canvas, audio track and time formatting.
pub mod core;
/// `StoryreelError` and `StoryreelResult`.
pub mod error;
