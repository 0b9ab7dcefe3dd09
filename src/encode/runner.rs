use std::{
    ffi::{OsStr, OsString},
    io::Read,
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Stdio},
    thread::JoinHandle,
    time::{Duration, Instant},
};

use crate::{
    encode::command::FfmpegCommand,
    foundation::error::{EncodeStage, StoryreelError, StoryreelResult},
};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Captured output of a successful tool invocation.
#[derive(Clone, Debug, Default)]
pub struct ToolOutput {
    /// Raw stdout bytes.
    pub stdout: Vec<u8>,
    /// Raw stderr bytes (ffmpeg writes diagnostics here even on success).
    pub stderr: Vec<u8>,
}

/// Why an external tool invocation did not succeed.
#[derive(thiserror::Error, Debug)]
pub enum ToolFailure {
    /// The process could not be started at all.
    #[error("failed to spawn '{program}' (is it installed and on PATH?): {source}")]
    Spawn {
        /// Program name or path.
        program: String,
        /// Spawn error.
        source: std::io::Error,
    },

    /// The process exited unsuccessfully.
    #[error("'{program}' exited with {status}: {stderr}")]
    Exit {
        /// Program name or path.
        program: String,
        /// Exit status rendered for display.
        status: String,
        /// Trimmed stderr diagnostics.
        stderr: String,
    },

    /// The process exceeded its time budget and was killed.
    #[error("'{program}' timed out after {:.1}s and was killed", .timeout.as_secs_f64())]
    TimedOut {
        /// Program name or path.
        program: String,
        /// Budget that was exceeded.
        timeout: Duration,
    },

    /// Waiting on the process or collecting its output failed.
    #[error("i/o error while running '{program}': {source}")]
    Io {
        /// Program name or path.
        program: String,
        /// Underlying error.
        source: std::io::Error,
    },
}

/// Run `program args..` to completion, enforcing `timeout` when set.
///
/// stdout/stderr are drained on helper threads so a chatty tool cannot block on a full pipe while
/// the caller polls for exit.
pub fn run_tool(
    program: &OsStr,
    args: &[OsString],
    timeout: Option<Duration>,
) -> Result<ToolOutput, ToolFailure> {
    let name = program.to_string_lossy().into_owned();
    tracing::debug!(program = %name, args = ?args, "spawning tool");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ToolFailure::Spawn {
            program: name.clone(),
            source,
        })?;

    let stdout_drain = child.stdout.take().map(drain);
    let stderr_drain = child.stderr.take().map(drain);

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(source) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ToolFailure::Io {
                    program: name,
                    source,
                });
            }
        }
        if let Some(limit) = timeout
            && started.elapsed() >= limit
        {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ToolFailure::TimedOut {
                program: name,
                timeout: limit,
            });
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    let stdout = join_drain(stdout_drain, &name)?;
    let stderr = join_drain(stderr_drain, &name)?;

    if !status.success() {
        return Err(ToolFailure::Exit {
            program: name,
            status: describe_status(status),
            stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
        });
    }

    Ok(ToolOutput { stdout, stderr })
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<std::io::Result<Vec<u8>>> {
    std::thread::spawn(move || {
        let mut bytes = Vec::new();
        pipe.read_to_end(&mut bytes)?;
        Ok(bytes)
    })
}

fn join_drain(
    handle: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    program: &str,
) -> Result<Vec<u8>, ToolFailure> {
    let Some(handle) = handle else {
        return Ok(Vec::new());
    };
    handle
        .join()
        .map_err(|_| ToolFailure::Io {
            program: program.to_string(),
            source: std::io::Error::other("output drain thread panicked"),
        })?
        .map_err(|source| ToolFailure::Io {
            program: program.to_string(),
            source,
        })
}

fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {code}"),
        None => status.to_string(),
    }
}

/// Return `true` when `program -version` can be invoked.
pub fn is_tool_available(program: &Path) -> bool {
    Command::new(program)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Executes encoder commands. The seam between scheduling logic and the external encoder.
pub trait EncoderBackend: Send + Sync {
    /// Run `cmd` to completion; failures are reported against `stage`.
    fn run(&self, cmd: &FfmpegCommand, stage: &EncodeStage) -> StoryreelResult<()>;
}

/// [`EncoderBackend`] that invokes the system `ffmpeg` binary.
#[derive(Clone, Debug)]
pub struct FfmpegBackend {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl FfmpegBackend {
    /// Backend invoking `program` with a per-invocation `timeout`.
    pub fn new(program: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

impl EncoderBackend for FfmpegBackend {
    fn run(&self, cmd: &FfmpegCommand, stage: &EncodeStage) -> StoryreelResult<()> {
        let args = cmd.to_args()?;
        run_tool(self.program.as_os_str(), &args, self.timeout)
            .map(|_| ())
            .map_err(|source| StoryreelError::encode(stage.clone(), source))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/runner.rs"]
mod tests;
