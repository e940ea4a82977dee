//! VAD engine abstraction.
//!
//! A [`VadEngine`] is a factory: it allocates one [`EngineInstance`] per
//! audio stream. Instances carry whatever state the inference keeps between
//! frames (smoothing, recurrent state, ...), which is why `process` takes
//! `&mut self` and why every instance is owned by exactly one
//! [`DetectorHandle`](crate::DetectorHandle).
//!
//! Engines report failures as raw status codes; the detector layer maps them
//! onto [`VadError`](crate::VadError) variants so the code is preserved.

pub mod energy;
pub mod library;

#[cfg(feature = "native")]
pub mod native;

#[cfg(test)]
pub(crate) mod scripted;

pub use energy::{EnergyEngine, EnergyEngineConfig};
pub use library::LibraryResolver;

#[cfg(feature = "native")]
pub use native::NativeEngine;

use std::fmt;
use std::sync::Arc;

/// Raw status code returned by an engine call. `0` is success.
pub type StatusCode = i32;

/// Known status codes of the TEN VAD C ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Success,
    InvalidParam,
    OutOfMemory,
    InvalidState,
    ProcessFailed,
    Unknown(StatusCode),
}

impl EngineStatus {
    pub fn from_code(code: StatusCode) -> Self {
        match code {
            0 => EngineStatus::Success,
            -1 => EngineStatus::InvalidParam,
            -2 => EngineStatus::OutOfMemory,
            -3 => EngineStatus::InvalidState,
            -4 => EngineStatus::ProcessFailed,
            other => EngineStatus::Unknown(other),
        }
    }

    pub fn code(self) -> StatusCode {
        match self {
            EngineStatus::Success => 0,
            EngineStatus::InvalidParam => -1,
            EngineStatus::OutOfMemory => -2,
            EngineStatus::InvalidState => -3,
            EngineStatus::ProcessFailed => -4,
            EngineStatus::Unknown(code) => code,
        }
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineStatus::Success => f.write_str("success"),
            EngineStatus::InvalidParam => f.write_str("invalid parameter"),
            EngineStatus::OutOfMemory => f.write_str("out of memory"),
            EngineStatus::InvalidState => f.write_str("invalid handle or state"),
            EngineStatus::ProcessFailed => f.write_str("processing error"),
            EngineStatus::Unknown(code) => write!(f, "unknown status {code}"),
        }
    }
}

/// What the engine reported for one frame, before the threshold policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineOutput {
    pub probability: f32,
    /// The engine's own 0/1 decision.
    pub flag: i32,
}

/// Contract for VAD backends.
pub trait VadEngine: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Allocate per-stream state for frames of `hop_size` samples.
    ///
    /// # Errors
    /// Returns the engine's non-zero status code; no state is left allocated.
    fn create(
        &self,
        hop_size: usize,
        threshold: f32,
    ) -> std::result::Result<Box<dyn EngineInstance>, StatusCode>;

    /// Engine version string, if the backend exposes one.
    fn version(&self) -> Option<String> {
        None
    }
}

/// One allocated engine state. Exclusively owned by a detector handle.
pub trait EngineInstance: Send {
    /// Run inference on exactly one hop of samples.
    fn process(&mut self, samples: &[i16]) -> std::result::Result<EngineOutput, StatusCode>;

    /// Release the engine state. Called at most once by the owning handle.
    fn destroy(&mut self) -> std::result::Result<(), StatusCode>;
}

/// Thread-safe reference-counted handle to any [`VadEngine`] implementor.
#[derive(Clone)]
pub struct EngineRef(pub Arc<dyn VadEngine>);

impl EngineRef {
    pub fn new<E: VadEngine>(engine: E) -> Self {
        Self(Arc::new(engine))
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }
}

impl std::ops::Deref for EngineRef {
    type Target = dyn VadEngine;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl fmt::Debug for EngineRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineRef")
            .field("name", &self.0.name())
            .finish_non_exhaustive()
    }
}
