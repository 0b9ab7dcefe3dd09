use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;

use crate::{
    assemble::concat::{DurationMismatch, assemble, reconcile_rendered},
    assets::{
        manifest::IllustrationManifest,
        media::{CachedProber, FfprobeProber, MediaProber},
        scan::{AssetKind, probe_assets, scan_assets},
    },
    config::{EncodeSettings, RunConfig},
    encode::runner::{EncoderBackend, FfmpegBackend, is_tool_available},
    foundation::{
        core::{AudioTrack, Canvas},
        error::{StoryreelError, StoryreelResult},
    },
    motion::zoom::ZoomDirection,
    render::pool::{build_thread_pool, render_all},
    timeline::{
        canvas::{CanvasSource, resolve_canvas},
        plan::{PlanOptions, Timeline},
    },
};

/// Per-run state shared read-only by every render worker.
///
/// Owns the scoped workspace: intermediate clips live there and the directory is removed when the
/// context is dropped, on success and failure alike.
pub struct RunContext {
    workspace: tempfile::TempDir,
    canvas: Canvas,
    settings: EncodeSettings,
    max_zoom: f64,
    clip_tolerance: f64,
    final_tolerance: f64,
    prober: Arc<dyn MediaProber>,
    encoder: Arc<dyn EncoderBackend>,
}

impl RunContext {
    /// Create the workspace under `parent` and freeze the run parameters.
    pub fn new(
        parent: &Path,
        canvas: Canvas,
        config: &RunConfig,
        prober: Arc<dyn MediaProber>,
        encoder: Arc<dyn EncoderBackend>,
    ) -> StoryreelResult<Self> {
        canvas.validate()?;
        let workspace = tempfile::Builder::new()
            .prefix(".storyreel-")
            .tempdir_in(parent)
            .with_context(|| format!("create workspace in '{}'", parent.display()))?;
        tracing::debug!(workspace = %workspace.path().display(), "created run workspace");
        Ok(Self {
            workspace,
            canvas,
            settings: config.encode_settings(),
            max_zoom: config.max_zoom,
            clip_tolerance: config.clip_tolerance_sec,
            final_tolerance: config.final_tolerance_sec,
            prober,
            encoder,
        })
    }

    /// Scratch directory for intermediate files.
    pub fn workspace(&self) -> &Path {
        self.workspace.path()
    }

    /// Canvas every clip conforms to.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Encoder settings for slide renders.
    pub fn settings(&self) -> &EncodeSettings {
        &self.settings
    }

    /// Peak zoom for still-image motion.
    pub fn max_zoom(&self) -> f64 {
        self.max_zoom
    }

    /// Per-clip duration tolerance.
    pub fn clip_tolerance(&self) -> f64 {
        self.clip_tolerance
    }

    /// Final-video duration tolerance.
    pub fn final_tolerance(&self) -> f64 {
        self.final_tolerance
    }

    /// Media prober.
    pub fn prober(&self) -> &dyn MediaProber {
        self.prober.as_ref()
    }

    /// Encoder backend.
    pub fn encoder(&self) -> &dyn EncoderBackend {
        self.encoder.as_ref()
    }
}

/// One line of the run report per slot.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct SlotReport {
    /// Timeline position.
    pub position: usize,
    /// Asset index from the file name.
    pub index: u32,
    /// Image or clip.
    pub kind: AssetKind,
    /// Source file.
    pub asset: PathBuf,
    /// Manifest title, when known.
    pub title: Option<String>,
    /// Allocated duration.
    pub allocated: f64,
    /// Frames rendered for the slot.
    pub frames: u64,
    /// Measured duration of the rendered clip.
    pub actual: f64,
    /// Camera motion applied.
    pub motion: Option<ZoomDirection>,
    /// The source clip's own audio was discarded.
    pub audio_dropped: bool,
}

/// Duration-reconciliation report for a finished run.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct RunReport {
    /// Final output path.
    pub output: PathBuf,
    /// Canvas used for every clip.
    pub canvas: Canvas,
    /// Where the canvas came from.
    pub canvas_source: CanvasSource,
    /// Narration duration.
    pub audio_duration: f64,
    /// Sum of allocated slot durations.
    pub allocated_total: f64,
    /// Video frames across all slots.
    pub total_frames: u64,
    /// Sum of measured clip durations.
    pub rendered_total: f64,
    /// Measured duration of the final video.
    pub final_duration: f64,
    /// `final_duration - audio_duration`.
    pub delta: f64,
    /// Effective fade length.
    pub fade_sec: f64,
    /// Per-slot details.
    pub slots: Vec<SlotReport>,
    /// Every tolerance breach seen during the run.
    pub mismatches: Vec<DurationMismatch>,
}

impl RunReport {
    /// Write the report as pretty JSON.
    pub fn write_json(&self, path: &Path) -> StoryreelResult<()> {
        let f = std::fs::File::create(path)
            .with_context(|| format!("create report '{}'", path.display()))?;
        serde_json::to_writer_pretty(f, self)
            .with_context(|| format!("write report '{}'", path.display()))?;
        Ok(())
    }
}

/// Run the whole engine against the system `ffmpeg`/`ffprobe`.
pub fn run(config: &RunConfig) -> StoryreelResult<RunReport> {
    for tool in [&config.ffmpeg, &config.ffprobe] {
        if !is_tool_available(tool) {
            return Err(StoryreelError::validation(format!(
                "'{}' is not available (install it or pass its path)",
                tool.display()
            )));
        }
    }
    let timeout = Some(config.tool_timeout);
    let prober = Arc::new(CachedProber::new(FfprobeProber::new(&config.ffprobe, timeout)));
    let encoder = Arc::new(FfmpegBackend::new(&config.ffmpeg, timeout));
    run_with(config, prober, encoder)
}

/// Run the whole engine with explicit probing and encoding backends.
///
/// Every global invariant (inputs, canvas, hold feasibility, duration sum) is checked before the
/// first encoder invocation.
#[tracing::instrument(skip_all, fields(work_dir = %config.work_dir.display()))]
pub fn run_with(
    config: &RunConfig,
    prober: Arc<dyn MediaProber>,
    encoder: Arc<dyn EncoderBackend>,
) -> StoryreelResult<RunReport> {
    config.validate()?;
    let output = config.output_path();
    let out_dir = output_dir(&output)?;

    let mut assets = scan_assets(&config.images_dir())?;
    if assets.is_empty() {
        return Err(StoryreelError::allocation(format!(
            "no illustration_<NN>.png or video_<NN>.mp4 files in '{}'",
            config.images_dir().display()
        )));
    }
    if let Some(manifest) = IllustrationManifest::load(&config.manifest_path())? {
        let orphaned = manifest.apply(&mut assets);
        if !orphaned.is_empty() {
            tracing::warn!(indices = ?orphaned, "manifest entries without a matching asset");
        }
    }
    let assets = probe_assets(assets, prober.as_ref())?;

    let audio_path = config.audio_path();
    let audio_sec = prober.probe(&audio_path)?.require_duration(&audio_path)?;
    let audio = AudioTrack::new(audio_path, audio_sec)?;
    tracing::info!(duration = audio.duration, "probed narration audio");

    let resolved = resolve_canvas(&assets, config.strict_canvas)?;
    let timeline = Timeline::build(
        assets,
        &audio,
        &PlanOptions {
            fade_sec: config.fade_sec,
            intro_hold_sec: config.intro_hold_sec,
            outro_hold_sec: config.outro_hold_sec,
            motion: config.motion,
            fps: resolved.canvas.fps,
        },
    )?;
    let pool = build_thread_pool(config.threads)?;

    let ctx = RunContext::new(&out_dir, resolved.canvas, config, prober, encoder)?;
    let clips = render_all(&ctx, &timeline, &pool)?;

    let mut mismatches: Vec<DurationMismatch> =
        clips.iter().filter_map(|c| c.mismatch.clone()).collect();
    let (rendered_total, pre_mux) =
        reconcile_rendered(&clips, &audio, config.final_tolerance_sec);
    mismatches.extend(pre_mux);

    let assembled = assemble(&ctx, &clips, &audio)?;
    mismatches.extend(assembled.mismatch.clone());

    std::fs::rename(&assembled.path, &output).with_context(|| {
        format!(
            "move '{}' to '{}'",
            assembled.path.display(),
            output.display()
        )
    })?;
    tracing::info!(
        output = %output.display(),
        "allocated {:.2}s vs actual {:.2}s",
        timeline.allocated_total(),
        assembled.duration
    );

    let slots = timeline
        .slots()
        .iter()
        .zip(&clips)
        .map(|(slot, clip)| SlotReport {
            position: slot.position,
            index: slot.asset.index,
            kind: slot.asset.kind,
            asset: slot.asset.path.clone(),
            title: slot.asset.title.clone(),
            allocated: slot.allocated_duration,
            frames: slot.frames,
            actual: clip.actual_duration,
            motion: slot.motion,
            audio_dropped: slot.asset.kind == AssetKind::PrerenderedClip && slot.asset.has_audio,
        })
        .collect();

    Ok(RunReport {
        output,
        canvas: resolved.canvas,
        canvas_source: resolved.source,
        audio_duration: audio.duration,
        allocated_total: timeline.allocated_total(),
        total_frames: timeline.total_frames(),
        rendered_total,
        final_duration: assembled.duration,
        delta: assembled.delta,
        fade_sec: timeline.fade_sec(),
        slots,
        mismatches,
    })
}

/// Directory the output lands in; the workspace is created there so the final move is a rename.
fn output_dir(output: &Path) -> StoryreelResult<PathBuf> {
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !dir.is_dir() {
        return Err(StoryreelError::validation(format!(
            "output directory '{}' does not exist",
            dir.display()
        )));
    }
    Ok(dir)
}

#[cfg(test)]
#[path = "../tests/unit/pipeline.rs"]
mod tests;
