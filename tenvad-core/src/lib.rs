//! # tenvad-core
//!
//! Frame-level voice activity detection over a pluggable inference engine.
//!
//! ## Architecture
//!
//! ```text
//! caller frame (slice / ndarray, any numeric type)
//!        │
//!   FrameValidator ── squeeze, shape, type, contiguity
//!        │
//!   VadStream (turn queue + handle Mutex) ── sync or spawn_blocking
//!        │
//!   DetectorHandle ── EngineInstance::process (native libten_vad or energy)
//!        │
//!   VadOutput ──► VadObserver / broadcast::Sender<FrameEvent>
//! ```
//!
//! The `eval` module drives streams over labelled WAV corpora and computes
//! precision/recall sweeps.

#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod detector;
pub mod engine;
pub mod error;
pub mod eval;
pub mod events;
pub mod frame;
pub mod stream;

pub use detector::{DetectorHandle, StreamConfig, DEFAULT_HOP_SIZE, DEFAULT_THRESHOLD};
pub use engine::{EnergyEngine, EngineInstance, EngineRef, LibraryResolver, VadEngine};
pub use error::{Result, VadError};
pub use events::{FrameEvent, VadFlag, VadOutput};
pub use frame::{AudioInput, Frame, FrameValidator};
pub use stream::{StreamOptions, VadObserver, VadStream};

#[cfg(feature = "native")]
pub use engine::NativeEngine;

/// Version of this binding crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
