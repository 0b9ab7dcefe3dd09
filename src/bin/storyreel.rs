use std::{path::PathBuf, time::Duration};

use clap::Parser;
use storyreel::{Quality, RunConfig, RunReport};

/// Fuse numbered images/clips and one narration track into a duration-exact video.
#[derive(Parser, Debug)]
#[command(name = "storyreel", version)]
struct Cli {
    /// Working directory containing `images/` and `audio.mp3`.
    work_dir: PathBuf,

    /// Output MP4 path (default: `<work_dir>/video.mp4`).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Fade duration in seconds (clamped to 40% of the shortest slot).
    #[arg(long, default_value_t = 0.5)]
    fade: f64,

    /// Fixed duration of the first slot in seconds.
    #[arg(long, default_value_t = 0.0)]
    intro_hold: f64,

    /// Fixed duration of the last slot in seconds.
    #[arg(long, default_value_t = 0.0)]
    outro_hold: f64,

    /// Alternate zoom-in/zoom-out on still images.
    #[arg(long, default_value_t = false)]
    motion: bool,

    /// Encoder quality preset.
    #[arg(long, value_enum, default_value_t = Quality::Medium)]
    quality: Quality,

    /// Render worker threads (default: available parallelism).
    #[arg(long)]
    threads: Option<usize>,

    /// Per-invocation ffmpeg/ffprobe timeout in seconds.
    #[arg(long, default_value_t = 600)]
    tool_timeout: u64,

    /// Fail instead of falling back to 1280x720 when no asset can be probed.
    #[arg(long, default_value_t = false)]
    strict_canvas: bool,

    /// ffmpeg binary.
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// ffprobe binary.
    #[arg(long, default_value = "ffprobe")]
    ffprobe: PathBuf,

    /// Write the duration-reconciliation report as JSON.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Debug-level logging (overridden by `RUST_LOG`).
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

impl Cli {
    fn to_config(&self) -> RunConfig {
        let mut config = RunConfig::new(&self.work_dir);
        config.output = self.out.clone();
        config.fade_sec = self.fade;
        config.intro_hold_sec = self.intro_hold;
        config.outro_hold_sec = self.outro_hold;
        config.motion = self.motion;
        config.quality = self.quality;
        config.threads = self.threads;
        config.tool_timeout = Duration::from_secs(self.tool_timeout);
        config.strict_canvas = self.strict_canvas;
        config.ffmpeg = self.ffmpeg.clone();
        config.ffprobe = self.ffprobe.clone();
        config
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_summary(report: &RunReport) {
    eprintln!(
        "wrote {} ({} slots, canvas {})",
        report.output.display(),
        report.slots.len(),
        report.canvas
    );
    eprintln!(
        "expected {:.2}s, allocated {:.2}s, rendered {:.2}s, final {:.2}s (delta {:+.2}s)",
        report.audio_duration,
        report.allocated_total,
        report.rendered_total,
        report.final_duration,
        report.delta
    );
    if !report.mismatches.is_empty() {
        eprintln!("{} duration warning(s):", report.mismatches.len());
        for m in &report.mismatches {
            eprintln!(
                "  {}: expected {:.2}s, got {:.2}s",
                m.subject, m.expected, m.actual
            );
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.to_config();
    let report = match storyreel::run(&config) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("storyreel: {} stage failed", err.stage_label());
            return Err(err.into());
        }
    };

    print_summary(&report);
    if let Some(path) = &cli.report {
        report.write_json(path)?;
        eprintln!("wrote report {}", path.display());
    }
    Ok(())
}
