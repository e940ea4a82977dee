use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// All errors produced by tenvad-core.
#[derive(Debug, Error)]
pub enum VadError {
    #[error("invalid stream configuration: {0}")]
    InvalidConfig(String),

    #[error("audio frame shape should be [{expected}], got {shape:?} ({actual} samples)")]
    InvalidShape {
        expected: usize,
        actual: usize,
        shape: Vec<usize>,
    },

    #[error("audio frame samples must be int16, got {found}")]
    InvalidType { found: &'static str },

    #[error("audio frame is not a contiguous buffer and layout normalization is disabled")]
    NotAContiguousBuffer,

    #[error("could not find the TEN VAD library; searched paths: {searched:?}")]
    LibraryNotFound { searched: Vec<PathBuf> },

    #[error("failed to load TEN VAD library from {path}: {reason}")]
    LibraryLoad { path: PathBuf, reason: String },

    #[error("TEN VAD library is missing symbol `{0}`")]
    MissingSymbol(&'static str),

    #[error("create handler failure with error code: {code}")]
    HandleCreationFailed { code: i32 },

    #[error("destroy handler failure with error code: {code}")]
    HandleDestructionFailed { code: i32 },

    #[error("process failed with error code: {code}")]
    ProcessingFailed { code: i32 },

    #[error("detector handle has already been destroyed")]
    HandleDestroyed,

    #[error("frame processing did not complete within {elapsed:?}")]
    Timeout { elapsed: Duration },

    #[error("frame observer failed: {0}")]
    Observer(#[source] anyhow::Error),

    #[error("background worker panicked while processing a frame")]
    WorkerPanicked,

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("label file {path}: {reason}")]
    Label { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VadError {
    /// The caller handed over a frame or config the engine can never accept.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            VadError::InvalidConfig(_)
                | VadError::InvalidShape { .. }
                | VadError::InvalidType { .. }
                | VadError::NotAContiguousBuffer
        )
    }

    /// The engine itself reported a non-zero status.
    pub fn is_engine_error(&self) -> bool {
        matches!(
            self,
            VadError::HandleCreationFailed { .. }
                | VadError::HandleDestructionFailed { .. }
                | VadError::ProcessingFailed { .. }
        )
    }

    /// Native status code carried by engine errors, if any.
    pub fn status_code(&self) -> Option<i32> {
        match self {
            VadError::HandleCreationFailed { code }
            | VadError::HandleDestructionFailed { code }
            | VadError::ProcessingFailed { code } => Some(*code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, VadError>;
