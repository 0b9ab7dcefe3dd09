//! Input discovery and probing.

/// Optional `illustrations.json` manifest.
pub mod manifest;
/// Media probing (`ffprobe`) and the per-run probe cache.
pub mod media;
/// Directory scanning into typed assets.
pub mod scan;
