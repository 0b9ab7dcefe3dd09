use crate::{
    assets::scan::{Asset, AssetKind},
    foundation::{
        core::AudioTrack,
        error::{StoryreelError, StoryreelResult},
    },
    motion::zoom::ZoomDirection,
    render::slide::motion_for,
    timeline::alloc::{allocate, clamp_fade, frame_spans},
};

/// Allowed |sum(slots) - audio| before any rendering starts.
pub const SUM_EPSILON_SEC: f64 = 0.01;

/// Scheduling knobs for [`Timeline::build`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlanOptions {
    /// Requested fade length before clamping.
    pub fade_sec: f64,
    /// Fixed display time of the first slot.
    pub intro_hold_sec: f64,
    /// Fixed display time of the last slot.
    pub outro_hold_sec: f64,
    /// Whether still images get camera motion.
    pub motion: bool,
    /// Output frame rate the slots are cut at.
    pub fps: u32,
}

/// One scheduled interval bound to one asset.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Slot {
    /// 0-based position in the timeline.
    pub position: usize,
    /// Backing asset.
    pub asset: Asset,
    /// Exact display duration in seconds.
    pub allocated_duration: f64,
    /// Frames the rendered clip must contain.
    pub frames: u64,
    /// Fade-in length at the head (0 = none).
    pub fade_in: f64,
    /// Fade-out length at the tail (0 = none).
    pub fade_out: f64,
    /// Camera motion for still images.
    pub motion: Option<ZoomDirection>,
}

/// The ordered schedule. Immutable once built.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Timeline {
    slots: Vec<Slot>,
    audio_duration: f64,
    fade_sec: f64,
}

impl Timeline {
    /// Allocate durations, clamp the fade and attach motion, then check the sum invariant.
    pub fn build(
        assets: Vec<Asset>,
        audio: &AudioTrack,
        opts: &PlanOptions,
    ) -> StoryreelResult<Self> {
        let durations = allocate(
            assets.len(),
            audio.duration,
            opts.intro_hold_sec,
            opts.outro_hold_sec,
        )?;

        if opts.fps == 0 {
            return Err(StoryreelError::validation("timeline fps must be non-zero"));
        }
        let frames = frame_spans(&durations, opts.fps);
        let fade = clamp_fade(opts.fade_sec, &durations);
        if fade < opts.fade_sec {
            tracing::warn!(
                requested = opts.fade_sec,
                effective = fade,
                "fade clamped to 40% of the shortest slot"
            );
        }

        let slots = assets
            .into_iter()
            .zip(durations.into_iter().zip(frames))
            .enumerate()
            .map(|(position, (asset, (allocated_duration, frames)))| {
                let fade_in = match asset.kind {
                    AssetKind::StaticImage => fade,
                    AssetKind::PrerenderedClip => 0.0,
                };
                Slot {
                    position,
                    motion: motion_for(position, asset.kind, opts.motion),
                    asset,
                    allocated_duration,
                    frames,
                    fade_in,
                    fade_out: fade,
                }
            })
            .collect();

        let timeline = Self {
            slots,
            audio_duration: audio.duration,
            fade_sec: fade,
        };
        timeline.check_sum()?;
        Ok(timeline)
    }

    fn check_sum(&self) -> StoryreelResult<()> {
        let total = self.allocated_total();
        if (total - self.audio_duration).abs() > SUM_EPSILON_SEC {
            return Err(StoryreelError::allocation(format!(
                "slot durations sum to {total:.3}s but the audio lasts {:.3}s",
                self.audio_duration
            )));
        }
        Ok(())
    }

    /// Slots in timeline order.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the timeline has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Sum of allocated durations.
    pub fn allocated_total(&self) -> f64 {
        self.slots.iter().map(|s| s.allocated_duration).sum()
    }

    /// Audio duration the timeline was built against.
    pub fn audio_duration(&self) -> f64 {
        self.audio_duration
    }

    /// Total frames across all slots.
    pub fn total_frames(&self) -> u64 {
        self.slots.iter().map(|s| s.frames).sum()
    }

    /// Effective (clamped) fade length.
    pub fn fade_sec(&self) -> f64 {
        self.fade_sec
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/plan.rs"]
mod tests;
