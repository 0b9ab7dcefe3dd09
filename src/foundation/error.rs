use std::path::PathBuf;

use crate::encode::runner::ToolFailure;

/// Convenience result type used across storyreel.
pub type StoryreelResult<T> = Result<T, StoryreelError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum StoryreelError {
    /// Invalid user-provided configuration, inputs or command parameters.
    #[error("validation error: {0}")]
    Validation(String),

    /// Required media could not be probed, or the probe output was unusable.
    #[error("probe failed for '{}': {reason}", .path.display())]
    Probe {
        /// File that was being probed.
        path: PathBuf,
        /// Human-readable failure reason (includes tool diagnostics when available).
        reason: String,
    },

    /// The timeline cannot be scheduled (no assets, or holds that do not fit the audio).
    #[error("allocation constraint violated: {0}")]
    Allocation(String),

    /// An external encoder invocation failed or timed out.
    #[error("encode failed during {stage}: {source}")]
    Encode {
        /// Which invocation failed.
        stage: EncodeStage,
        /// Underlying tool failure.
        source: ToolFailure,
    },

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoryreelError {
    /// Build a [`StoryreelError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`StoryreelError::Probe`] value.
    pub fn probe(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Probe {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`StoryreelError::Allocation`] value.
    pub fn allocation(msg: impl Into<String>) -> Self {
        Self::Allocation(msg.into())
    }

    /// Build a [`StoryreelError::Encode`] value.
    pub fn encode(stage: EncodeStage, source: ToolFailure) -> Self {
        Self::Encode { stage, source }
    }

    /// Short stage label for user-facing failure summaries.
    pub fn stage_label(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Probe { .. } => "probe",
            Self::Allocation(_) => "allocation",
            Self::Encode {
                stage: EncodeStage::Assemble,
                ..
            } => "assembly",
            Self::Encode { .. } => "slide render",
            Self::Other(_) => "io",
        }
    }
}

/// Identifies the encoder invocation an [`StoryreelError::Encode`] belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncodeStage {
    /// Normalizing one slot into its rendered clip.
    Slide {
        /// Slot position in the timeline (0-based).
        slot: usize,
        /// Source asset path.
        asset: PathBuf,
    },
    /// Concatenating repeats of a short pre-rendered clip.
    Repeat {
        /// Slot position in the timeline (0-based).
        slot: usize,
        /// Source asset path.
        asset: PathBuf,
    },
    /// Final concat + audio mux.
    Assemble,
}

impl std::fmt::Display for EncodeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Slide { slot, asset } => write!(f, "slot {slot} ('{}')", asset.display()),
            Self::Repeat { slot, asset } => {
                write!(f, "loop extension of slot {slot} ('{}')", asset.display())
            }
            Self::Assemble => f.write_str("final assembly"),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
