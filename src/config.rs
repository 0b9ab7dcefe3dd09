use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    assets::manifest::MANIFEST_FILE,
    foundation::error::{StoryreelError, StoryreelResult},
    motion::zoom::DEFAULT_MAX_ZOOM,
};

/// Directory (inside the working directory) holding images and clips.
pub const IMAGES_DIR: &str = "images";
/// Narration file name (inside the working directory).
pub const AUDIO_FILE: &str = "audio.mp3";
/// Default output file name (inside the working directory).
pub const DEFAULT_OUTPUT_FILE: &str = "video.mp4";

/// Encoder quality preset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    /// Smaller files.
    Low,
    /// Balanced default.
    #[default]
    Medium,
    /// Larger, cleaner files.
    High,
}

impl Quality {
    /// x264 constant rate factor for this preset.
    pub fn crf(self) -> u8 {
        match self {
            Self::Low => 28,
            Self::Medium => 23,
            Self::High => 18,
        }
    }
}

/// Settings shared by every encoder invocation of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncodeSettings {
    /// x264 constant rate factor.
    pub crf: u8,
    /// x264 speed preset.
    pub preset: &'static str,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            crf: Quality::Medium.crf(),
            preset: "fast",
        }
    }
}

/// Everything one run needs. Construct with [`RunConfig::new`] and adjust fields.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Working directory containing `images/` and `audio.mp3`.
    pub work_dir: PathBuf,
    /// Output path; defaults to `<work_dir>/video.mp4`.
    pub output: Option<PathBuf>,
    /// Requested fade length (clamped to 40% of the shortest slot).
    pub fade_sec: f64,
    /// Fixed display time of the first slot.
    pub intro_hold_sec: f64,
    /// Fixed display time of the last slot.
    pub outro_hold_sec: f64,
    /// Alternating zoom on still images.
    pub motion: bool,
    /// Peak zoom factor for still-image motion.
    pub max_zoom: f64,
    /// Encoder quality preset.
    pub quality: Quality,
    /// Render worker count; `None` uses the available parallelism.
    pub threads: Option<usize>,
    /// Per-invocation time budget for ffmpeg/ffprobe.
    pub tool_timeout: Duration,
    /// Allowed |actual - allocated| per rendered clip before warning.
    pub clip_tolerance_sec: f64,
    /// Allowed |final - audio| before warning.
    pub final_tolerance_sec: f64,
    /// Treat "no probeable asset" as an error instead of using the fallback canvas.
    pub strict_canvas: bool,
    /// ffmpeg binary.
    pub ffmpeg: PathBuf,
    /// ffprobe binary.
    pub ffprobe: PathBuf,
}

impl RunConfig {
    /// Defaults for `work_dir`.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            output: None,
            fade_sec: 0.5,
            intro_hold_sec: 0.0,
            outro_hold_sec: 0.0,
            motion: false,
            max_zoom: DEFAULT_MAX_ZOOM,
            quality: Quality::Medium,
            threads: None,
            tool_timeout: Duration::from_secs(600),
            clip_tolerance_sec: 0.1,
            final_tolerance_sec: 0.5,
            strict_canvas: false,
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }

    /// `<work_dir>/images`.
    pub fn images_dir(&self) -> PathBuf {
        self.work_dir.join(IMAGES_DIR)
    }

    /// `<work_dir>/audio.mp3`.
    pub fn audio_path(&self) -> PathBuf {
        self.work_dir.join(AUDIO_FILE)
    }

    /// `<work_dir>/illustrations.json`.
    pub fn manifest_path(&self) -> PathBuf {
        self.work_dir.join(MANIFEST_FILE)
    }

    /// Resolved output path.
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.work_dir.join(DEFAULT_OUTPUT_FILE))
    }

    /// Encoder settings derived from the quality preset.
    pub fn encode_settings(&self) -> EncodeSettings {
        EncodeSettings {
            crf: self.quality.crf(),
            ..EncodeSettings::default()
        }
    }

    /// Check numeric ranges and required inputs on disk.
    pub fn validate(&self) -> StoryreelResult<()> {
        non_negative("fade", self.fade_sec)?;
        non_negative("intro hold", self.intro_hold_sec)?;
        non_negative("outro hold", self.outro_hold_sec)?;
        non_negative("clip tolerance", self.clip_tolerance_sec)?;
        non_negative("final tolerance", self.final_tolerance_sec)?;
        if !self.max_zoom.is_finite() || self.max_zoom < 1.0 {
            return Err(StoryreelError::validation(format!(
                "max zoom must be >= 1.0, got {}",
                self.max_zoom
            )));
        }
        if self.threads == Some(0) {
            return Err(StoryreelError::validation("threads must be >= 1 when set"));
        }
        if self.tool_timeout.is_zero() {
            return Err(StoryreelError::validation("tool timeout must be non-zero"));
        }
        require_dir(&self.work_dir, "working directory")?;
        require_dir(&self.images_dir(), "images directory")?;
        if !self.audio_path().is_file() {
            return Err(StoryreelError::validation(format!(
                "audio file '{}' not found",
                self.audio_path().display()
            )));
        }
        Ok(())
    }
}

fn non_negative(what: &str, v: f64) -> StoryreelResult<()> {
    if !v.is_finite() || v < 0.0 {
        return Err(StoryreelError::validation(format!(
            "{what} must be a finite value >= 0, got {v}"
        )));
    }
    Ok(())
}

fn require_dir(path: &Path, what: &str) -> StoryreelResult<()> {
    if !path.is_dir() {
        return Err(StoryreelError::validation(format!(
            "{what} '{}' not found",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
