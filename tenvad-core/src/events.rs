//! Per-frame results and the events broadcast to stream subscribers.
//!
//! Both types serialize with camelCase field names so a frontend can consume
//! them directly as JSON.

use serde::{Deserialize, Serialize};

/// Binary voice activity decision for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VadFlag {
    Silence,
    Speech,
}

impl VadFlag {
    /// Threshold policy: speech iff `probability >= threshold`.
    pub fn from_probability(probability: f32, threshold: f32) -> Self {
        if probability >= threshold {
            VadFlag::Speech
        } else {
            VadFlag::Silence
        }
    }

    pub fn is_speech(self) -> bool {
        self == VadFlag::Speech
    }

    /// `0` for silence, `1` for speech, matching the native ABI.
    pub fn as_i32(self) -> i32 {
        match self {
            VadFlag::Silence => 0,
            VadFlag::Speech => 1,
        }
    }
}

/// Result of processing one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VadOutput {
    /// Speech probability in [0.0, 1.0].
    pub probability: f32,
    pub flag: VadFlag,
}

impl VadOutput {
    pub fn is_speech(&self) -> bool {
        self.flag.is_speech()
    }
}

/// Broadcast to [`VadStream::subscribe`](crate::VadStream::subscribe) receivers
/// after each successfully processed frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameEvent {
    /// Monotonically increasing frame sequence number within the stream.
    pub seq: u64,
    pub probability: f32,
    pub is_speech: bool,
}

impl FrameEvent {
    pub fn new(seq: u64, output: &VadOutput) -> Self {
        Self {
            seq,
            probability: output.probability,
            is_speech: output.is_speech(),
        }
    }
}
