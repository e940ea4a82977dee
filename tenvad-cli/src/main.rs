//! `tenvad`: run the detector over WAV files from the command line.
//!
//! - `tenvad process in.wav out.txt` writes one `[i] prob, flag` line per frame.
//! - `tenvad sweep <dir>` evaluates every labelled WAV in a directory and
//!   writes precision/recall rows for thresholds 0.00..=1.00.

mod settings;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use settings::{default_settings_path, load_settings, save_settings, CliSettings};
use tenvad_core::eval::{self, report, wav};
use tenvad_core::{EnergyEngine, EngineRef, StreamConfig, VadStream};
use tracing::{info, warn};

const EXPECTED_SAMPLE_RATE: u32 = 16_000;
const DEFAULT_PR_OUTPUT: &str = "PR_data_TEN_VAD.txt";

#[derive(Parser)]
#[command(name = "tenvad")]
#[command(about = "Frame-level voice activity detection with TEN VAD")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Settings file (defaults to the per-user config directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Inference backend
    #[arg(long, value_enum, global = true)]
    engine: Option<EngineKind>,

    /// Explicit path to the native library
    #[arg(long, global = true)]
    library: Option<PathBuf>,

    /// Samples per frame
    #[arg(long, global = true)]
    hop_size: Option<usize>,

    /// Speech decision threshold in [0, 1]
    #[arg(long, global = true)]
    threshold: Option<f32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one WAV file and dump per-frame results
    Process {
        input: PathBuf,
        output: PathBuf,
        /// Do not echo frame lines to stdout
        #[arg(long)]
        quiet: bool,
    },
    /// Precision/recall sweep over a directory of WAV + .scv label pairs
    Sweep {
        dir: PathBuf,
        #[arg(long, default_value = DEFAULT_PR_OUTPUT)]
        output: PathBuf,
    },
    /// Print the engine version
    Version,
    /// Print the effective settings
    Settings {
        /// Persist the effective settings (including flag overrides)
        #[arg(long)]
        save: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum EngineKind {
    Native,
    Energy,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tenvad=info".parse().unwrap_or_default()),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let settings_path = args.settings.clone().unwrap_or_else(default_settings_path);
    let settings = effective_settings(load_settings(&settings_path), &args);

    match &args.command {
        Command::Process {
            input,
            output,
            quiet,
        } => run_process(&settings, input, output, *quiet),
        Command::Sweep { dir, output } => run_sweep(&settings, dir, output),
        Command::Version => {
            let engine = build_engine(&settings)?;
            println!(
                "{} version: {}",
                engine.name(),
                engine.version().unwrap_or_else(|| "unknown".into())
            );
            Ok(())
        }
        Command::Settings { save } => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
            if *save {
                save_settings(&settings_path, &settings)
                    .with_context(|| format!("writing {}", settings_path.display()))?;
                info!(path = %settings_path.display(), "settings saved");
            }
            Ok(())
        }
    }
}

fn effective_settings(mut settings: CliSettings, args: &Args) -> CliSettings {
    if let Some(kind) = args.engine {
        settings.engine = match kind {
            EngineKind::Native => "native".into(),
            EngineKind::Energy => "energy".into(),
        };
    }
    if let Some(path) = &args.library {
        settings.library_path = Some(path.clone());
    }
    if let Some(hop) = args.hop_size {
        settings.hop_size = hop;
    }
    if let Some(t) = args.threshold {
        settings.threshold = t;
    }
    settings
}

#[cfg(feature = "native")]
fn native_engine(settings: &CliSettings) -> Result<EngineRef> {
    use tenvad_core::{LibraryResolver, NativeEngine};

    let engine = match &settings.library_path {
        Some(path) => NativeEngine::load(path)?,
        None => NativeEngine::with_resolver(&LibraryResolver::from_env())?,
    };
    Ok(EngineRef::new(engine))
}

#[cfg(not(feature = "native"))]
fn native_engine(_settings: &CliSettings) -> Result<EngineRef> {
    bail!("built without the `native` feature; use --engine energy")
}

fn build_engine(settings: &CliSettings) -> Result<EngineRef> {
    match settings.engine.as_str() {
        "energy" => Ok(EngineRef::new(EnergyEngine::default())),
        _ => native_engine(settings),
    }
}

fn stream_config(settings: &CliSettings) -> Result<StreamConfig> {
    StreamConfig::new(settings.hop_size, settings.threshold).context("invalid stream configuration")
}

fn run_process(settings: &CliSettings, input: &Path, output: &Path, quiet: bool) -> Result<()> {
    let config = stream_config(settings)?;
    let audio = wav::read_pcm16(input).with_context(|| format!("reading {}", input.display()))?;
    if audio.sample_rate != EXPECTED_SAMPLE_RATE {
        warn!(
            sample_rate = audio.sample_rate,
            "input is not 16 kHz; results will be unreliable"
        );
    }
    if audio.source_channels > 1 {
        warn!(channels = audio.source_channels, "using channel 0 only");
    }

    let engine = build_engine(settings)?;
    let stream = VadStream::new(engine, config)?;

    let audio_ms = audio.duration_ms();
    println!("total_audio_time: {audio_ms:.2}(ms)");
    println!("Audio frame Num: {}", audio.frame_count(config.hop_size()));

    let started = Instant::now();
    let outputs = eval::process_samples(&stream, &audio.samples)?;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    stream.close()?;

    if !quiet {
        for (i, out) in outputs.iter().enumerate() {
            println!("{}", report::format_frame_line(i, out));
        }
    }

    let rtf = if audio_ms > 0.0 { elapsed_ms / audio_ms } else { 0.0 };
    println!(
        "Consuming time: {elapsed_ms:.6}(ms), audio-time: {audio_ms:.2}(ms), =====> RTF: {rtf:.6}"
    );

    let file = File::create(output).with_context(|| format!("creating {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    report::write_frame_dump(&mut writer, &outputs)?;
    writer.flush()?;

    let diag = stream.diagnostics();
    info!(
        frames = diag.frames_processed,
        speech = diag.speech_frames,
        output = %output.display(),
        "done"
    );
    Ok(())
}

fn run_sweep(settings: &CliSettings, dir: &Path, output: &Path) -> Result<()> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    let config = stream_config(settings)?;
    let engine = build_engine(settings)?;

    let corpus = eval::evaluate_directory(&engine, dir, config)?;
    if corpus.files.is_empty() {
        bail!("no labelled WAV files found in {}", dir.display());
    }
    let points = corpus.sweep();
    report::write_pr_rows(output, &points)
        .with_context(|| format!("writing {}", output.display()))?;

    if let Some(best) = points
        .iter()
        .max_by(|a, b| f1(a.precision, a.recall).total_cmp(&f1(b.precision, b.recall)))
    {
        info!(
            files = corpus.files.len(),
            frames = corpus.probabilities.len(),
            threshold = best.threshold,
            precision = best.precision,
            recall = best.recall,
            "best F1 operating point"
        );
    }
    println!("PR rows written to {}", output.display());
    Ok(())
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_loaded_settings() {
        let args = Args::parse_from([
            "tenvad",
            "--engine",
            "energy",
            "--threshold",
            "0.7",
            "version",
        ]);
        let s = effective_settings(CliSettings::default(), &args);
        assert_eq!(s.engine, "energy");
        assert_eq!(s.threshold, 0.7);
        assert_eq!(s.hop_size, tenvad_core::DEFAULT_HOP_SIZE);
    }

    #[test]
    fn process_with_energy_engine_writes_dump() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in.wav");
        let output = tmp.path().join("out.txt");
        write_silence(&input, 256 * 3);

        let settings = CliSettings {
            engine: "energy".into(),
            ..CliSettings::default()
        };
        run_process(&settings, &input, &output, true).unwrap();

        let text = std::fs::read_to_string(&output).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.starts_with("[0] 0.000000, 0"));
    }

    #[test]
    fn invalid_threshold_is_reported() {
        let settings = CliSettings {
            threshold: 2.0,
            ..CliSettings::default()
        };
        assert!(stream_config(&settings).is_err());
    }

    #[test]
    fn f1_handles_zero() {
        assert_eq!(f1(0.0, 0.0), 0.0);
        assert!((f1(0.5, 0.5) - 0.5).abs() < 1e-12);
    }

    fn write_silence(path: &Path, samples: usize) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..samples {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }
}
