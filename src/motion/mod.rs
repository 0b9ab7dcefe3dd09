//! Camera motion synthesis for still-image slots.

/// Closed-form zoom trajectories.
pub mod zoom;
