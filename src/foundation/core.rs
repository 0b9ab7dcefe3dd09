use std::path::{Path, PathBuf};

use crate::foundation::error::{StoryreelError, StoryreelResult};

/// Output frame rate shared by every rendered clip. Uniform fps keeps stream-copy concatenation valid.
pub const CANVAS_FPS: u32 = 24;

/// Canvas used when no asset yields usable dimensions.
pub const FALLBACK_CANVAS: Canvas = Canvas {
    width: 1280,
    height: 720,
    fps: CANVAS_FPS,
};

/// Resolution/frame-rate contract every rendered clip must satisfy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Canvas {
    /// Width in pixels (even).
    pub width: u32,
    /// Height in pixels (even).
    pub height: u32,
    /// Frames per second.
    pub fps: u32,
}

impl Canvas {
    /// Create a validated canvas.
    pub fn new(width: u32, height: u32, fps: u32) -> StoryreelResult<Self> {
        let canvas = Self { width, height, fps };
        canvas.validate()?;
        Ok(canvas)
    }

    /// Build a canvas from arbitrary source dimensions, rounding down to even values (min 2).
    pub fn from_source_dims(width: u32, height: u32) -> StoryreelResult<Self> {
        if width == 0 || height == 0 {
            return Err(StoryreelError::validation(format!(
                "source dimensions must be non-zero, got {width}x{height}"
            )));
        }
        Self::new(even_floor(width), even_floor(height), CANVAS_FPS)
    }

    /// Check the yuv420p/h264 constraints.
    pub fn validate(&self) -> StoryreelResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(StoryreelError::validation(
                "canvas width/height must be non-zero",
            ));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            return Err(StoryreelError::validation(format!(
                "canvas {}x{} must have even dimensions (required for yuv420p output)",
                self.width, self.height
            )));
        }
        if self.fps == 0 {
            return Err(StoryreelError::validation("canvas fps must be non-zero"));
        }
        Ok(())
    }

    /// Duration of `frames` output frames in seconds.
    pub fn frames_to_secs(&self, frames: u64) -> f64 {
        frames as f64 / f64::from(self.fps)
    }

    /// `WxH` form used by ffmpeg size options.
    pub fn size_arg(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

impl std::fmt::Display for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}@{}fps", self.width, self.height, self.fps)
    }
}

fn even_floor(v: u32) -> u32 {
    (v - v % 2).max(2)
}

/// The narration track: single source of truth for total timeline length.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct AudioTrack {
    /// Audio file path.
    pub path: PathBuf,
    /// Probed duration in seconds.
    pub duration: f64,
}

impl AudioTrack {
    /// Create a validated audio track.
    pub fn new(path: impl Into<PathBuf>, duration: f64) -> StoryreelResult<Self> {
        let path = path.into();
        if !duration.is_finite() || duration <= 0.0 {
            return Err(StoryreelError::probe(
                path,
                format!("audio duration must be positive, got {duration}"),
            ));
        }
        Ok(Self { path, duration })
    }

    /// Audio file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Format seconds for tool arguments: fixed 6 decimals with trailing zeros trimmed.
pub fn fmt_secs(secs: f64) -> String {
    let s = format!("{secs:.6}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-" || s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
