//! storyreel turns an ordered set of still images and short pre-rendered clips plus one narration
//! track into a single video whose length matches the narration.
//!
//! # Pipeline overview
//!
//! 1. **Scan/probe**: `images/` -> typed [`Asset`]s, narration -> [`AudioTrack`]
//! 2. **Schedule**: [`resolve_canvas`] picks one canvas; [`Timeline::build`] allocates one exact
//!    duration per slot and checks that they sum to the audio length
//! 3. **Render**: every [`Slot`] becomes one normalized clip ([`render_slot`]), in parallel
//! 4. **Assemble**: clips are concatenated without re-encoding and muxed with the narration
//!    ([`assemble`]), then the final duration is reconciled against the audio
//!
//! All raster and audio work is delegated to `ffmpeg`/`ffprobe`; this crate owns allocation,
//! sequencing, normalization and verification around them.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assemble;
mod assets;
mod config;
mod encode;
mod foundation;
mod motion;
mod pipeline;
mod render;
mod timeline;

#[cfg(test)]
#[path = "../tests/unit/support.rs"]
mod test_support;

pub use assemble::concat::{
    AssembledVideo, DurationMismatch, assemble, assemble_command, escape_concat_path,
    reconcile_rendered, write_concat_manifest,
};
pub use assets::manifest::{IllustrationManifest, MANIFEST_FILE, ManifestEntry};
pub use assets::media::{CachedProber, FfprobeProber, MediaInfo, MediaProber, parse_probe_json};
pub use assets::scan::{
    Asset, AssetKind, CLIP_PREFIX, IMAGE_PREFIX, parse_asset_name, probe_assets, scan_assets,
};
pub use config::{AUDIO_FILE, DEFAULT_OUTPUT_FILE, EncodeSettings, IMAGES_DIR, Quality, RunConfig};
pub use encode::command::{AudioCodec, FfmpegCommand, Input, StreamMap, VideoCodec, VideoFilter};
pub use encode::runner::{
    EncoderBackend, FfmpegBackend, ToolFailure, ToolOutput, is_tool_available, run_tool,
};
pub use foundation::core::{AudioTrack, CANVAS_FPS, Canvas, FALLBACK_CANVAS, fmt_secs};
pub use foundation::error::{EncodeStage, StoryreelError, StoryreelResult};
pub use motion::zoom::{DEFAULT_MAX_ZOOM, ZoomDirection, ZoomTrajectory};
pub use pipeline::{RunContext, RunReport, SlotReport, run, run_with};
pub use render::pool::{build_thread_pool, render_all};
pub use render::slide::{
    ClipStrategy, RenderedClip, clip_command, fit_within, motion_for, render_slot,
    repeat_command, select_clip_strategy, still_command,
};
pub use timeline::alloc::{MAX_FADE_FRACTION, allocate, clamp_fade};
pub use timeline::canvas::{CanvasSource, ResolvedCanvas, resolve_canvas};
pub use timeline::plan::{PlanOptions, SUM_EPSILON_SEC, Slot, Timeline};
