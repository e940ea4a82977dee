//! Offline evaluation: run WAV files through a stream and score the result
//! against segment labels.

pub mod labels;
pub mod metrics;
pub mod report;
pub mod wav;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::detector::StreamConfig;
use crate::engine::EngineRef;
use crate::error::Result;
use crate::events::VadOutput;
use crate::stream::VadStream;

/// Extension of the label file that sits next to each WAV file.
pub const LABEL_EXTENSION: &str = "scv";

/// Feed every complete frame of `samples` through `stream`, in order.
pub fn process_samples(stream: &VadStream, samples: &[i16]) -> Result<Vec<VadOutput>> {
    samples
        .chunks_exact(stream.hop_size())
        .map(|frame| stream.process(frame))
        .collect()
}

/// Pair per-frame probabilities with frame-wise labels.
///
/// The detector's output lags the labels by one frame, so the first
/// probability and the last label are dropped after trimming both to the
/// shorter length.
pub fn align(probabilities: &[f32], labels: &[u8]) -> (Vec<f32>, Vec<u8>) {
    let n = probabilities.len().min(labels.len());
    if n < 2 {
        return (Vec::new(), Vec::new());
    }
    (probabilities[1..n].to_vec(), labels[..n - 1].to_vec())
}

/// Run one WAV file on a fresh stream and return aligned scores and labels.
pub fn evaluate_file(
    engine: &EngineRef,
    wav_path: &Path,
    label_path: &Path,
    config: StreamConfig,
) -> Result<(Vec<f32>, Vec<u8>)> {
    let audio = wav::read_pcm16(wav_path)?;
    let segments = labels::read_label_file(label_path)?;
    // One label per possible output frame is enough for alignment.
    let max_frames = audio.samples.len() / config.hop_size() + 1;
    let framewise = labels::labels_to_framewise(
        &segments,
        config.hop_size(),
        audio.sample_rate,
        max_frames,
    );

    let stream = VadStream::new(engine.clone(), config)?;
    let outputs = process_samples(&stream, &audio.samples)?;
    stream.close()?;

    let probabilities: Vec<f32> = outputs.iter().map(|o| o.probability).collect();
    Ok(align(&probabilities, &framewise))
}

/// Concatenated scores over a directory of labelled recordings.
#[derive(Debug, Default, Clone)]
pub struct EvalCorpus {
    pub probabilities: Vec<f32>,
    pub labels: Vec<u8>,
    pub files: Vec<PathBuf>,
}

impl EvalCorpus {
    pub fn sweep(&self) -> Vec<metrics::PrPoint> {
        metrics::sweep(&self.probabilities, &self.labels)
    }
}

/// Evaluate every `*.wav` in `dir` (sorted by name) that has a sibling
/// `.scv` label file. Files without labels are skipped with a warning.
pub fn evaluate_directory(
    engine: &EngineRef,
    dir: &Path,
    config: StreamConfig,
) -> Result<EvalCorpus> {
    let mut wavs: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
        })
        .collect();
    wavs.sort();

    let mut corpus = EvalCorpus::default();
    for wav_path in wavs {
        let label_path = wav_path.with_extension(LABEL_EXTENSION);
        if !label_path.is_file() {
            warn!(wav = %wav_path.display(), "no label file, skipping");
            continue;
        }
        let (probs, labels) = evaluate_file(engine, &wav_path, &label_path, config)?;
        info!(wav = %wav_path.display(), frames = probs.len(), "evaluated");
        corpus.probabilities.extend(probs);
        corpus.labels.extend(labels);
        corpus.files.push(wav_path);
    }
    Ok(corpus)
}
