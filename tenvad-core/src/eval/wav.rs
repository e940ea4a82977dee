//! 16-bit PCM WAV input for batch runs.

use std::path::Path;

use anyhow::anyhow;
use hound::{SampleFormat, WavReader};
use tracing::debug;

use crate::error::{Result, VadError};

/// Mono int16 samples read from a WAV file.
#[derive(Debug, Clone)]
pub struct PcmAudio {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    /// Channel count of the source file; only channel 0 is kept.
    pub source_channels: u16,
}

impl PcmAudio {
    pub fn duration_ms(&self) -> f64 {
        self.samples.len() as f64 * 1000.0 / self.sample_rate as f64
    }

    /// Complete frames of `hop_size` samples; a trailing partial frame is dropped.
    pub fn frames(&self, hop_size: usize) -> std::slice::ChunksExact<'_, i16> {
        self.samples.chunks_exact(hop_size.max(1))
    }

    pub fn frame_count(&self, hop_size: usize) -> usize {
        self.samples.len() / hop_size.max(1)
    }
}

/// Read a 16-bit integer PCM WAV file.
///
/// # Errors
/// - `VadError::Wav` if the file cannot be parsed.
/// - `VadError::Other` if the samples are not 16-bit integer PCM.
pub fn read_pcm16(path: impl AsRef<Path>) -> Result<PcmAudio> {
    let path = path.as_ref();
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(VadError::Other(anyhow!(
            "{}: expected 16-bit integer PCM, got {}-bit {:?}",
            path.display(),
            spec.bits_per_sample,
            spec.sample_format
        )));
    }

    let channels = spec.channels.max(1) as usize;
    let interleaved = reader
        .into_samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let samples: Vec<i16> = interleaved.into_iter().step_by(channels).collect();

    debug!(
        path = %path.display(),
        sample_rate = spec.sample_rate,
        channels = spec.channels,
        samples = samples.len(),
        "WAV loaded"
    );

    Ok(PcmAudio {
        samples,
        sample_rate: spec.sample_rate,
        source_channels: spec.channels,
    })
}
