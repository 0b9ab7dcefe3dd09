use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};

use crate::{
    encode::runner::run_tool,
    foundation::error::{StoryreelError, StoryreelResult},
};

/// Facts reported by the probing tool for one media file.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct MediaInfo {
    /// Container (or first stream) duration in seconds.
    pub duration_sec: Option<f64>,
    /// Width of the first video stream.
    pub width: Option<u32>,
    /// Height of the first video stream.
    pub height: Option<u32>,
    /// Whether any audio stream is present.
    pub has_audio: bool,
}

impl MediaInfo {
    /// `(width, height)` when both are known and non-zero.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        }
    }

    /// Duration, or a probe error naming `path` when it is missing or non-positive.
    pub fn require_duration(&self, path: &Path) -> StoryreelResult<f64> {
        match self.duration_sec {
            Some(d) if d.is_finite() && d > 0.0 => Ok(d),
            Some(d) => Err(StoryreelError::probe(
                path,
                format!("duration must be positive, got {d}"),
            )),
            None => Err(StoryreelError::probe(path, "no duration reported")),
        }
    }
}

/// Queries duration and raster dimensions of media files.
pub trait MediaProber: Send + Sync {
    /// Probe one file. Fails with [`StoryreelError::Probe`].
    fn probe(&self, path: &Path) -> StoryreelResult<MediaInfo>;
}

/// [`MediaProber`] backed by the system `ffprobe` binary (JSON output).
#[derive(Clone, Debug)]
pub struct FfprobeProber {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl FfprobeProber {
    /// Prober invoking `program` with a per-invocation `timeout`.
    pub fn new(program: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

impl MediaProber for FfprobeProber {
    fn probe(&self, path: &Path) -> StoryreelResult<MediaInfo> {
        let args = [
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_entries",
            "format=duration:stream=codec_type,width,height,duration",
        ]
        .into_iter()
        .map(std::ffi::OsString::from)
        .chain(std::iter::once(path.as_os_str().to_owned()))
        .collect::<Vec<_>>();

        let out = run_tool(self.program.as_os_str(), &args, self.timeout)
            .map_err(|e| StoryreelError::probe(path, e.to_string()))?;
        parse_probe_json(&out.stdout).map_err(|reason| StoryreelError::probe(path, reason))
    }
}

/// Parse `ffprobe -print_format json` output into [`MediaInfo`].
///
/// Durations that ffprobe reports as `"N/A"` or omits are treated as unknown rather than errors;
/// malformed JSON is an error.
pub fn parse_probe_json(stdout: &[u8]) -> Result<MediaInfo, String> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        #[serde(default)]
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let parsed: ProbeOut =
        serde_json::from_slice(stdout).map_err(|e| format!("ffprobe json parse failed: {e}"))?;

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));

    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| parse_duration(f.duration.as_deref()))
        .or_else(|| {
            parsed
                .streams
                .iter()
                .find_map(|s| parse_duration(s.duration.as_deref()))
        });

    Ok(MediaInfo {
        duration_sec,
        width: video.and_then(|s| s.width),
        height: video.and_then(|s| s.height),
        has_audio: parsed
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("audio")),
    })
}

fn parse_duration(raw: Option<&str>) -> Option<f64> {
    raw?.trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
}

/// Memoizing wrapper: each distinct path is probed at most once per run.
///
/// Failures are not cached, so callers see the same error if they ask again.
pub struct CachedProber<P> {
    inner: P,
    cache: Mutex<HashMap<PathBuf, MediaInfo>>,
}

impl<P: MediaProber> CachedProber<P> {
    /// Wrap `inner`.
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

impl<P: MediaProber> MediaProber for CachedProber<P> {
    fn probe(&self, path: &Path) -> StoryreelResult<MediaInfo> {
        if let Ok(cache) = self.cache.lock()
            && let Some(hit) = cache.get(path)
        {
            return Ok(hit.clone());
        }
        let info = self.inner.probe(path)?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(path.to_path_buf(), info.clone());
        }
        Ok(info)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/media.rs"]
mod tests;
