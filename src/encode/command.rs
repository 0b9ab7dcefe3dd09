use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use crate::{
    foundation::core::{Canvas, fmt_secs},
    foundation::error::{StoryreelError, StoryreelResult},
    motion::zoom::ZoomTrajectory,
};

/// One ffmpeg input.
#[derive(Clone, Debug, PartialEq)]
pub enum Input {
    /// Plain media file (image decoded once, or a video/audio stream).
    File(PathBuf),
    /// Still image repeated indefinitely at `framerate` (`-loop 1`).
    LoopedStill {
        /// Image path.
        path: PathBuf,
        /// Input frame rate.
        framerate: u32,
    },
    /// Concat-demuxer list file (`-f concat -safe 0`).
    ConcatList(PathBuf),
}

impl Input {
    fn path(&self) -> &Path {
        match self {
            Self::File(p) | Self::ConcatList(p) => p,
            Self::LoopedStill { path, .. } => path,
        }
    }

    fn push_args(&self, out: &mut Vec<OsString>) {
        match self {
            Self::File(_) => {}
            Self::LoopedStill { framerate, .. } => {
                push_args(out, ["-loop", "1", "-framerate", framerate.to_string().as_str()]);
            }
            Self::ConcatList(_) => push_args(out, ["-f", "concat", "-safe", "0"]),
        }
        out.push("-i".into());
        out.push(self.path().as_os_str().to_owned());
    }
}

/// Video filters the engine knows how to emit. Serialized in order into one `-vf` chain.
#[derive(Clone, Debug, PartialEq)]
pub enum VideoFilter {
    /// Force square pixels.
    SetSar,
    /// Scale to an exact size.
    Scale {
        /// Target width.
        width: u32,
        /// Target height.
        height: u32,
    },
    /// Scale to fit inside a box, preserving aspect ratio.
    FitScale {
        /// Box width.
        width: u32,
        /// Box height.
        height: u32,
    },
    /// Letterbox (center) to an exact size.
    Pad {
        /// Output width.
        width: u32,
        /// Output height.
        height: u32,
    },
    /// Centered zoom driven by a frame-indexed expression.
    ZoomPan {
        /// Zoom function of the output frame counter.
        trajectory: ZoomTrajectory,
        /// Output canvas (size and fps).
        canvas: Canvas,
    },
    /// Fade from black starting at t=0.
    FadeIn {
        /// Fade length in seconds.
        duration: f64,
    },
    /// Fade to black.
    FadeOut {
        /// Fade start timestamp in seconds.
        start: f64,
        /// Fade length in seconds.
        duration: f64,
    },
}

impl VideoFilter {
    /// Letterbox fit to `canvas`: aspect-preserving scale followed by centered padding.
    pub fn letterbox(canvas: &Canvas) -> [Self; 2] {
        [
            Self::FitScale {
                width: canvas.width,
                height: canvas.height,
            },
            Self::Pad {
                width: canvas.width,
                height: canvas.height,
            },
        ]
    }

    fn validate(&self) -> StoryreelResult<()> {
        match self {
            Self::SetSar => Ok(()),
            Self::Scale { width, height }
            | Self::FitScale { width, height }
            | Self::Pad { width, height } => {
                if *width == 0 || *height == 0 {
                    return Err(StoryreelError::validation(format!(
                        "filter size must be non-zero, got {width}x{height}"
                    )));
                }
                Ok(())
            }
            Self::ZoomPan { canvas, .. } => canvas.validate(),
            Self::FadeIn { duration } => positive("fade-in duration", *duration),
            Self::FadeOut { start, duration } => {
                positive("fade-out duration", *duration)?;
                if !start.is_finite() || *start < 0.0 {
                    return Err(StoryreelError::validation(format!(
                        "fade-out start must be >= 0, got {start}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// ffmpeg filter syntax for this filter.
    pub fn render(&self) -> String {
        match self {
            Self::SetSar => "setsar=1".to_string(),
            Self::Scale { width, height } => format!("scale={width}:{height}"),
            Self::FitScale { width, height } => {
                format!("scale={width}:{height}:force_original_aspect_ratio=decrease")
            }
            Self::Pad { width, height } => format!("pad={width}:{height}:(ow-iw)/2:(oh-ih)/2"),
            Self::ZoomPan { trajectory, canvas } => format!(
                "zoompan=z='{}':x='iw/2-(iw/zoom/2)':y='ih/2-(ih/zoom/2)':d={}:s={}:fps={}",
                trajectory.to_expr(),
                trajectory.total_frames(),
                canvas.size_arg(),
                canvas.fps
            ),
            Self::FadeIn { duration } => format!("fade=t=in:st=0:d={}", fmt_secs(*duration)),
            Self::FadeOut { start, duration } => format!(
                "fade=t=out:st={}:d={}",
                fmt_secs(*start),
                fmt_secs(*duration)
            ),
        }
    }
}

/// Output video codec.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VideoCodec {
    /// Stream copy (no filters allowed).
    Copy,
    /// libx264, yuv420p.
    H264 {
        /// Constant rate factor (0-51).
        crf: u8,
        /// x264 speed preset.
        preset: &'static str,
    },
}

/// Output audio handling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioCodec {
    /// Drop audio (`-an`).
    None,
    /// Re-encode to AAC.
    Aac,
}

/// Which stream of an input to map into the output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamMap {
    /// First video stream of input `n`.
    Video(usize),
    /// First audio stream of input `n`.
    Audio(usize),
}

impl StreamMap {
    fn input(self) -> usize {
        match self {
            Self::Video(i) | Self::Audio(i) => i,
        }
    }

    fn render(self) -> String {
        match self {
            Self::Video(i) => format!("{i}:v:0"),
            Self::Audio(i) => format!("{i}:a:0"),
        }
    }
}

/// Typed ffmpeg invocation. Argument invariants are checked in [`FfmpegCommand::to_args`] before
/// anything is serialized.
#[derive(Clone, Debug, PartialEq)]
pub struct FfmpegCommand {
    inputs: Vec<Input>,
    filters: Vec<VideoFilter>,
    maps: Vec<StreamMap>,
    frame_rate: Option<u32>,
    frames: Option<u64>,
    video: VideoCodec,
    audio: AudioCodec,
    generate_pts: bool,
    faststart: bool,
    output: PathBuf,
}

impl FfmpegCommand {
    /// Start a command writing to `output` (overwritten if present).
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            inputs: Vec::new(),
            filters: Vec::new(),
            maps: Vec::new(),
            frame_rate: None,
            frames: None,
            video: VideoCodec::Copy,
            audio: AudioCodec::None,
            generate_pts: false,
            faststart: false,
            output: output.into(),
        }
    }

    /// Append an input.
    pub fn input(mut self, input: Input) -> Self {
        self.inputs.push(input);
        self
    }

    /// Append a filter to the video chain.
    pub fn filter(mut self, filter: VideoFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Append several filters to the video chain.
    pub fn filters(mut self, filters: impl IntoIterator<Item = VideoFilter>) -> Self {
        self.filters.extend(filters);
        self
    }

    /// Map a stream explicitly into the output.
    pub fn map(mut self, map: StreamMap) -> Self {
        self.maps.push(map);
        self
    }

    /// Output frame rate.
    pub fn frame_rate(mut self, fps: u32) -> Self {
        self.frame_rate = Some(fps);
        self
    }

    /// Exact number of output video frames (`-frames:v`).
    pub fn frames(mut self, frames: u64) -> Self {
        self.frames = Some(frames);
        self
    }

    /// Output video codec.
    pub fn video_codec(mut self, codec: VideoCodec) -> Self {
        self.video = codec;
        self
    }

    /// Output audio handling.
    pub fn audio_codec(mut self, codec: AudioCodec) -> Self {
        self.audio = codec;
        self
    }

    /// Regenerate missing presentation timestamps on input.
    pub fn generate_pts(mut self) -> Self {
        self.generate_pts = true;
        self
    }

    /// Move the moov atom to the front of the file.
    pub fn faststart(mut self) -> Self {
        self.faststart = true;
        self
    }

    /// Output path.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Configured inputs.
    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    /// Configured output frame count, if any.
    pub fn output_frames(&self) -> Option<u64> {
        self.frames
    }

    /// Output duration implied by the frame budget and output rate.
    pub fn output_duration(&self) -> Option<f64> {
        match (self.frames, self.frame_rate) {
            (Some(frames), Some(fps)) if fps > 0 => Some(frames as f64 / f64::from(fps)),
            _ => None,
        }
    }

    /// Serialized `-vf` chain, if any filter is configured.
    pub fn filter_chain(&self) -> Option<String> {
        if self.filters.is_empty() {
            return None;
        }
        Some(
            self.filters
                .iter()
                .map(VideoFilter::render)
                .collect::<Vec<_>>()
                .join(","),
        )
    }

    /// Check argument invariants without serializing.
    pub fn validate(&self) -> StoryreelResult<()> {
        if self.inputs.is_empty() {
            return Err(StoryreelError::validation(
                "ffmpeg command needs at least one input",
            ));
        }
        if self.output.as_os_str().is_empty() {
            return Err(StoryreelError::validation("ffmpeg output path is empty"));
        }
        if self.inputs.iter().any(|i| i.path() == self.output) {
            return Err(StoryreelError::validation(format!(
                "ffmpeg output '{}' would overwrite one of its inputs",
                self.output.display()
            )));
        }
        for input in &self.inputs {
            if let Input::LoopedStill { framerate: 0, .. } = input {
                return Err(StoryreelError::validation("looped still framerate must be > 0"));
            }
        }
        for filter in &self.filters {
            filter.validate()?;
        }
        if !self.filters.is_empty() && self.video == VideoCodec::Copy {
            return Err(StoryreelError::validation(
                "video filters require re-encoding; stream copy cannot be filtered",
            ));
        }
        if let VideoCodec::H264 { crf, .. } = self.video
            && crf > 51
        {
            return Err(StoryreelError::validation(format!(
                "x264 crf must be in 0..=51, got {crf}"
            )));
        }
        if self.frame_rate == Some(0) {
            return Err(StoryreelError::validation("output frame rate must be > 0"));
        }
        if self.frames == Some(0) {
            return Err(StoryreelError::validation("output frame count must be > 0"));
        }
        if self.frames.is_some() && self.frame_rate.is_none() {
            return Err(StoryreelError::validation(
                "a frame budget needs an explicit output frame rate",
            ));
        }
        for map in &self.maps {
            if map.input() >= self.inputs.len() {
                return Err(StoryreelError::validation(format!(
                    "stream map '{}' references a missing input",
                    map.render()
                )));
            }
        }
        Ok(())
    }

    /// Validate and serialize into an argument list (program name excluded).
    pub fn to_args(&self) -> StoryreelResult<Vec<OsString>> {
        self.validate()?;

        let mut args = Vec::new();
        push_args(&mut args, ["-y", "-hide_banner", "-loglevel", "error"]);
        if self.generate_pts {
            push_args(&mut args, ["-fflags", "+genpts"]);
        }
        for input in &self.inputs {
            input.push_args(&mut args);
        }
        if let Some(chain) = self.filter_chain() {
            push_args(&mut args, ["-vf", chain.as_str()]);
        }
        for map in &self.maps {
            push_args(&mut args, ["-map", map.render().as_str()]);
        }
        if let Some(fps) = self.frame_rate {
            push_args(&mut args, ["-r", fps.to_string().as_str()]);
        }
        if let Some(frames) = self.frames {
            push_args(&mut args, ["-frames:v", frames.to_string().as_str()]);
        }
        match self.video {
            VideoCodec::Copy => push_args(&mut args, ["-c:v", "copy"]),
            VideoCodec::H264 { crf, preset } => push_args(
                &mut args,
                [
                    "-c:v",
                    "libx264",
                    "-crf",
                    crf.to_string().as_str(),
                    "-preset",
                    preset,
                    "-pix_fmt",
                    "yuv420p",
                ],
            ),
        }
        match self.audio {
            AudioCodec::None => push_args(&mut args, ["-an"]),
            AudioCodec::Aac => push_args(&mut args, ["-c:a", "aac"]),
        }
        push_args(&mut args, ["-avoid_negative_ts", "make_zero"]);
        if self.faststart {
            push_args(&mut args, ["-movflags", "+faststart"]);
        }
        args.push(self.output.as_os_str().to_owned());
        Ok(args)
    }
}

fn push_args<const N: usize>(out: &mut Vec<OsString>, items: [&str; N]) {
    out.extend(items.into_iter().map(OsString::from));
}

fn positive(what: &str, v: f64) -> StoryreelResult<()> {
    if !v.is_finite() || v <= 0.0 {
        return Err(StoryreelError::validation(format!(
            "{what} must be a positive finite number, got {v}"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/command.rs"]
mod tests;
