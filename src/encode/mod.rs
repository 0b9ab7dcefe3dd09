//! Encoder plumbing: typed ffmpeg commands and the subprocess runner behind them.

/// Typed ffmpeg command builder.
pub mod command;
/// Subprocess execution with timeouts, and the [`EncoderBackend`](runner::EncoderBackend) seam.
pub mod runner;
