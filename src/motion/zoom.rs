use crate::foundation::error::{StoryreelError, StoryreelResult};

/// Peak zoom factor reached at the end of a zoom-in (start of a zoom-out).
pub const DEFAULT_MAX_ZOOM: f64 = 1.16;

/// Direction of the synthesized camera move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoomDirection {
    /// Start at 1.0, end at `max_zoom`.
    In,
    /// Start at `max_zoom`, end at 1.0.
    Out,
}

impl ZoomDirection {
    /// Alternating policy: even positions zoom in, odd positions zoom out.
    pub fn alternating(position: usize) -> Self {
        if position.is_multiple_of(2) {
            Self::In
        } else {
            Self::Out
        }
    }
}

/// Closed-form zoom trajectory over `total_frames` output frames.
///
/// `progress(n) = min(n / (total_frames - 1), 1)`; zoom-in is `1 + (max - 1) * progress`,
/// zoom-out is `max - (max - 1) * progress`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomTrajectory {
    direction: ZoomDirection,
    total_frames: u64,
    max_zoom: f64,
}

impl ZoomTrajectory {
    /// Build a trajectory, or `None` for single-frame slots (no motion possible).
    pub fn new(
        direction: ZoomDirection,
        total_frames: u64,
        max_zoom: f64,
    ) -> StoryreelResult<Option<Self>> {
        if !max_zoom.is_finite() || max_zoom < 1.0 {
            return Err(StoryreelError::validation(format!(
                "max zoom must be a finite value >= 1.0, got {max_zoom}"
            )));
        }
        if total_frames <= 1 {
            return Ok(None);
        }
        Ok(Some(Self {
            direction,
            total_frames,
            max_zoom,
        }))
    }

    /// Direction of travel.
    pub fn direction(&self) -> ZoomDirection {
        self.direction
    }

    /// Number of frames the trajectory spans.
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Normalized progress in `[0, 1]` at frame `n`.
    pub fn progress(&self, n: u64) -> f64 {
        let den = (self.total_frames - 1) as f64;
        (n as f64 / den).min(1.0)
    }

    /// Zoom factor at frame `n`.
    pub fn zoom_at(&self, n: u64) -> f64 {
        let span = self.max_zoom - 1.0;
        match self.direction {
            ZoomDirection::In => 1.0 + span * self.progress(n),
            ZoomDirection::Out => self.max_zoom - span * self.progress(n),
        }
    }

    /// The same function as an ffmpeg `zoompan` expression over the output frame counter `on`.
    pub fn to_expr(&self) -> String {
        let span = self.max_zoom - 1.0;
        let progress = format!("min(on/{},1)", self.total_frames - 1);
        match self.direction {
            ZoomDirection::In => format!("1+({span:.6})*{progress}"),
            ZoomDirection::Out => format!("{:.6}-({span:.6})*{progress}", self.max_zoom),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/motion/zoom.rs"]
mod tests;
