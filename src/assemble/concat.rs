use std::{
    io::Write as _,
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::{
    encode::command::{AudioCodec, FfmpegCommand, Input, StreamMap, VideoCodec},
    foundation::{
        core::AudioTrack,
        error::{EncodeStage, StoryreelError, StoryreelResult},
    },
    pipeline::RunContext,
    render::slide::RenderedClip,
};

/// Duration deviation beyond tolerance. Reported and logged, never fatal.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct DurationMismatch {
    /// What was measured (`slot 3`, `rendered total`, `final video`).
    pub subject: String,
    /// Target duration in seconds.
    pub expected: f64,
    /// Measured duration in seconds.
    pub actual: f64,
    /// `actual - expected`.
    pub delta: f64,
    /// Tolerance that was exceeded.
    pub tolerance: f64,
}

impl DurationMismatch {
    /// Compare `actual` with `expected`; logs and returns a record when they differ by more than
    /// `tolerance`.
    pub fn check(
        subject: impl Into<String>,
        expected: f64,
        actual: f64,
        tolerance: f64,
    ) -> Option<Self> {
        let delta = actual - expected;
        if delta.abs() <= tolerance {
            return None;
        }
        let subject = subject.into();
        tracing::warn!(
            subject = %subject,
            expected,
            actual,
            delta,
            "duration mismatch beyond {tolerance}s"
        );
        Some(Self {
            subject,
            expected,
            actual,
            delta,
            tolerance,
        })
    }
}

/// Quote a path for an ffmpeg concat list: single quotes, with embedded quotes as `'\''`.
pub fn escape_concat_path(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', r"'\''"))
}

/// Write a concat-demuxer list referencing `entries` (made absolute) in order.
pub fn write_concat_manifest(list: &Path, entries: &[PathBuf]) -> StoryreelResult<()> {
    if entries.is_empty() {
        return Err(StoryreelError::validation("concat list needs at least one entry"));
    }
    let mut body = String::new();
    for entry in entries {
        let abs = std::path::absolute(entry)
            .with_context(|| format!("resolve absolute path of '{}'", entry.display()))?;
        body.push_str("file ");
        body.push_str(&escape_concat_path(&abs));
        body.push('\n');
    }
    let mut file = std::fs::File::create(list)
        .with_context(|| format!("create concat list '{}'", list.display()))?;
    file.write_all(body.as_bytes())
        .with_context(|| format!("write concat list '{}'", list.display()))?;
    Ok(())
}

/// Final mux: concatenated video copied as-is, narration re-encoded to AAC, clip audio discarded.
pub fn assemble_command(list: &Path, audio: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(output)
        .generate_pts()
        .input(Input::ConcatList(list.to_path_buf()))
        .input(Input::File(audio.to_path_buf()))
        .map(StreamMap::Video(0))
        .map(StreamMap::Audio(1))
        .video_codec(VideoCodec::Copy)
        .audio_codec(AudioCodec::Aac)
        .faststart()
}

/// Sum of rendered durations, checked against the audio before the final mux.
pub fn reconcile_rendered(
    clips: &[RenderedClip],
    audio: &AudioTrack,
    tolerance: f64,
) -> (f64, Option<DurationMismatch>) {
    let total: f64 = clips.iter().map(|c| c.actual_duration).sum();
    let mismatch = DurationMismatch::check("rendered total", audio.duration, total, tolerance);
    (total, mismatch)
}

/// The muxed video inside the workspace, before promotion to the output path.
#[derive(Clone, Debug, PartialEq)]
pub struct AssembledVideo {
    /// Muxed file.
    pub path: PathBuf,
    /// Re-probed duration.
    pub duration: f64,
    /// `duration - audio.duration`.
    pub delta: f64,
    /// Set when `|delta|` exceeds the final tolerance.
    pub mismatch: Option<DurationMismatch>,
}

/// Concatenate `clips` in slot order, mux `audio` and reconcile the final duration.
#[tracing::instrument(skip_all, fields(clips = clips.len()))]
pub fn assemble(
    ctx: &RunContext,
    clips: &[RenderedClip],
    audio: &AudioTrack,
) -> StoryreelResult<AssembledVideo> {
    let mut ordered: Vec<&RenderedClip> = clips.iter().collect();
    ordered.sort_by_key(|c| c.slot_index);
    let entries: Vec<PathBuf> = ordered.iter().map(|c| c.path.clone()).collect();

    let list = ctx.workspace().join("concat.txt");
    let output = ctx.workspace().join("final.mp4");
    write_concat_manifest(&list, &entries)?;

    ctx.encoder().run(
        &assemble_command(&list, audio.path(), &output),
        &EncodeStage::Assemble,
    )?;

    let duration = ctx.prober().probe(&output)?.require_duration(&output)?;
    let delta = duration - audio.duration;
    let mismatch =
        DurationMismatch::check("final video", audio.duration, duration, ctx.final_tolerance());
    tracing::info!(
        "duration reconciliation: audio {:.2}s, video {duration:.2}s, delta {delta:+.2}s",
        audio.duration
    );
    Ok(AssembledVideo {
        path: output,
        duration,
        delta,
        mismatch,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/assemble/concat.rs"]
mod tests;
