use std::path::{Path, PathBuf};

use crate::{
    assemble::concat::{DurationMismatch, write_concat_manifest},
    assets::scan::AssetKind,
    config::EncodeSettings,
    encode::command::{AudioCodec, FfmpegCommand, Input, VideoCodec, VideoFilter},
    foundation::{
        core::Canvas,
        error::{EncodeStage, StoryreelError, StoryreelResult},
    },
    motion::zoom::{ZoomDirection, ZoomTrajectory},
    pipeline::RunContext,
    timeline::plan::Slot,
};

/// A normalized per-slot clip in the run workspace.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct RenderedClip {
    /// Position of the slot this clip realizes.
    pub slot_index: usize,
    /// Clip file inside the workspace.
    pub path: PathBuf,
    /// Duration the slot was allocated.
    pub allocated_duration: f64,
    /// Duration measured by re-probing the clip.
    pub actual_duration: f64,
    /// Set when the measured duration is outside the per-clip tolerance.
    pub mismatch: Option<DurationMismatch>,
}

/// How a pre-rendered clip is fitted to its slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClipStrategy {
    /// Clip is long enough: cut at the allocated duration.
    Trim,
    /// Clip is too short: concatenate `repeats` copies, then trim.
    Loop {
        /// Number of back-to-back copies.
        repeats: u32,
    },
}

/// Trim iff `clip_sec >= allocated_sec`; otherwise loop `floor(allocated / clip) + 2` times.
pub fn select_clip_strategy(clip_sec: f64, allocated_sec: f64) -> ClipStrategy {
    if clip_sec >= allocated_sec {
        return ClipStrategy::Trim;
    }
    let whole = if clip_sec > 0.0 {
        (allocated_sec / clip_sec).floor()
    } else {
        0.0
    };
    let repeats = if whole.is_finite() && whole < f64::from(u32::MAX - 2) {
        whole as u32 + 2
    } else {
        u32::MAX
    };
    ClipStrategy::Loop { repeats }
}

/// Camera motion policy: still images alternate In/Out by slot position; clips never move.
pub fn motion_for(position: usize, kind: AssetKind, enabled: bool) -> Option<ZoomDirection> {
    match kind {
        AssetKind::StaticImage if enabled => Some(ZoomDirection::alternating(position)),
        AssetKind::StaticImage | AssetKind::PrerenderedClip => None,
    }
}

/// Largest even-sized box with the source aspect ratio that fits inside `canvas`.
pub fn fit_within(src_width: u32, src_height: u32, canvas: &Canvas) -> (u32, u32) {
    let scale = (f64::from(canvas.width) / f64::from(src_width))
        .min(f64::from(canvas.height) / f64::from(src_height));
    let even = |v: f64, max: u32| -> u32 {
        let v = (v.floor() as u32).min(max);
        (v - v % 2).max(2)
    };
    (
        even(f64::from(src_width) * scale, canvas.width),
        even(f64::from(src_height) * scale, canvas.height),
    )
}

fn fades(slot: &Slot, canvas: &Canvas) -> Vec<VideoFilter> {
    let mut out = Vec::new();
    if slot.fade_in > 0.0 {
        out.push(VideoFilter::FadeIn {
            duration: slot.fade_in,
        });
    }
    if slot.fade_out > 0.0 {
        out.push(VideoFilter::FadeOut {
            start: (canvas.frames_to_secs(slot.frames) - slot.fade_out).max(0.0),
            duration: slot.fade_out,
        });
    }
    out
}

fn h264(settings: &EncodeSettings) -> VideoCodec {
    VideoCodec::H264 {
        crf: settings.crf,
        preset: settings.preset,
    }
}

/// Fit a still image onto the canvas: exact even scale when its size is known, aspect-preserving
/// scale otherwise, then centered padding. Pixels are not yet square after this.
fn still_fit(slot: &Slot, canvas: &Canvas) -> [VideoFilter; 2] {
    let scale = match slot.asset.dimensions() {
        Some((w, h)) => {
            let (width, height) = fit_within(w, h, canvas);
            VideoFilter::Scale { width, height }
        }
        None => VideoFilter::FitScale {
            width: canvas.width,
            height: canvas.height,
        },
    };
    [
        scale,
        VideoFilter::Pad {
            width: canvas.width,
            height: canvas.height,
        },
    ]
}

/// Encoder command for a still-image slot.
///
/// With motion the image is decoded once and `zoompan` emits every frame; without it the image is
/// looped at the canvas frame rate. Slots too short for two frames get no motion. Both paths end
/// with square pixels and exactly `slot.frames` frames.
pub fn still_command(
    slot: &Slot,
    canvas: &Canvas,
    settings: &EncodeSettings,
    max_zoom: f64,
    output: &Path,
) -> StoryreelResult<FfmpegCommand> {
    let trajectory = match slot.motion {
        Some(direction) => ZoomTrajectory::new(direction, slot.frames, max_zoom)?,
        None => None,
    };

    let cmd = FfmpegCommand::new(output);
    let cmd = match trajectory {
        Some(trajectory) => cmd
            .input(Input::File(slot.asset.path.clone()))
            .filters(still_fit(slot, canvas))
            .filter(VideoFilter::ZoomPan {
                trajectory,
                canvas: *canvas,
            })
            .filter(VideoFilter::SetSar),
        None => cmd
            .input(Input::LoopedStill {
                path: slot.asset.path.clone(),
                framerate: canvas.fps,
            })
            .filters(still_fit(slot, canvas))
            .filter(VideoFilter::SetSar),
    };
    Ok(cmd
        .filters(fades(slot, canvas))
        .frame_rate(canvas.fps)
        .frames(slot.frames)
        .video_codec(h264(settings))
        .audio_codec(AudioCodec::None))
}

/// Encoder command normalizing `source` (the clip or its looped extension) into a slot clip.
pub fn clip_command(
    slot: &Slot,
    source: &Path,
    canvas: &Canvas,
    settings: &EncodeSettings,
    output: &Path,
) -> FfmpegCommand {
    FfmpegCommand::new(output)
        .input(Input::File(source.to_path_buf()))
        .filters(VideoFilter::letterbox(canvas))
        .filter(VideoFilter::SetSar)
        .filters(fades(slot, canvas))
        .frame_rate(canvas.fps)
        .frames(slot.frames)
        .video_codec(h264(settings))
        .audio_codec(AudioCodec::None)
}

/// Stream-copy concatenation of a repeat list.
pub fn repeat_command(list: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(output)
        .input(Input::ConcatList(list.to_path_buf()))
        .video_codec(VideoCodec::Copy)
        .audio_codec(AudioCodec::None)
}

/// Render one slot into the workspace, re-probe it and report the result.
#[tracing::instrument(skip_all, fields(slot = slot.position, asset = %slot.asset.file_name()))]
pub fn render_slot(ctx: &RunContext, slot: &Slot, total: usize) -> StoryreelResult<RenderedClip> {
    let output = ctx.workspace().join(format!("slot_{:04}.mp4", slot.position));
    let stage = EncodeStage::Slide {
        slot: slot.position,
        asset: slot.asset.path.clone(),
    };

    match slot.asset.kind {
        AssetKind::StaticImage => {
            let cmd = still_command(
                slot,
                &ctx.canvas(),
                ctx.settings(),
                ctx.max_zoom(),
                &output,
            )?;
            ctx.encoder().run(&cmd, &stage)?;
        }
        AssetKind::PrerenderedClip => {
            let clip_sec = slot.asset.probed_duration.ok_or_else(|| {
                StoryreelError::probe(&slot.asset.path, "clip has no probed duration")
            })?;
            let frame_sec = ctx.canvas().frames_to_secs(1);
            if clip_sec < frame_sec {
                return Err(StoryreelError::probe(
                    &slot.asset.path,
                    format!("clip lasts {clip_sec}s, shorter than one {frame_sec:.4}s frame"),
                ));
            }
            if slot.asset.has_audio {
                tracing::debug!("dropping the clip's own audio track");
            }
            let source = match select_clip_strategy(clip_sec, slot.allocated_duration) {
                ClipStrategy::Trim => slot.asset.path.clone(),
                ClipStrategy::Loop { repeats } => {
                    tracing::debug!(clip_sec, repeats, "extending short clip by looping");
                    extend_by_looping(ctx, slot, repeats)?
                }
            };
            let cmd = clip_command(slot, &source, &ctx.canvas(), ctx.settings(), &output);
            ctx.encoder().run(&cmd, &stage)?;
        }
    }

    let actual_duration = ctx.prober().probe(&output)?.require_duration(&output)?;
    let mismatch = DurationMismatch::check(
        format!("slot {}", slot.position),
        slot.allocated_duration,
        actual_duration,
        ctx.clip_tolerance(),
    );
    match &slot.asset.title {
        Some(title) => tracing::info!(
            "clip {}/{} created: {actual_duration:.2}s ({title})",
            slot.position + 1,
            total
        ),
        None => tracing::info!(
            "clip {}/{} created: {actual_duration:.2}s",
            slot.position + 1,
            total
        ),
    }

    Ok(RenderedClip {
        slot_index: slot.position,
        path: output,
        allocated_duration: slot.allocated_duration,
        actual_duration,
        mismatch,
    })
}

fn extend_by_looping(ctx: &RunContext, slot: &Slot, repeats: u32) -> StoryreelResult<PathBuf> {
    let list = ctx
        .workspace()
        .join(format!("repeat_{:04}.txt", slot.position));
    let looped = ctx
        .workspace()
        .join(format!("repeat_{:04}.mp4", slot.position));
    let entries = vec![slot.asset.path.clone(); repeats as usize];
    write_concat_manifest(&list, &entries)?;

    let stage = EncodeStage::Repeat {
        slot: slot.position,
        asset: slot.asset.path.clone(),
    };
    ctx.encoder().run(&repeat_command(&list, &looped), &stage)?;
    Ok(looped)
}

#[cfg(test)]
#[path = "../../tests/unit/render/slide.rs"]
mod tests;
