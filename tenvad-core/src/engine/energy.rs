//! Pure-Rust reference engine: RMS level mapped to a probability.
//!
//! This is not TEN VAD. It implements the same engine contract so streams can
//! run (and be tested) without the native library present.
//!
//! ## Algorithm
//!
//! 1. Compute the RMS of the int16 frame, normalised to [0, 1].
//! 2. Convert to dBFS and map `[floor_dbfs, ceil_dbfs]` linearly onto [0, 1].
//! 3. Smooth across frames: `p = smoothing * p_prev + (1 - smoothing) * p_raw`.
//!
//! The smoothing state lives in the instance, so replacing the handle (for
//! example on a threshold change) starts again from zero.

use tracing::debug;

use super::{EngineInstance, EngineOutput, EngineStatus, StatusCode, VadEngine};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyEngineConfig {
    /// Level mapped to probability 0. Default: -60 dBFS.
    pub floor_dbfs: f32,
    /// Level mapped to probability 1. Default: -20 dBFS.
    pub ceil_dbfs: f32,
    /// Weight of the previous probability in [0, 1). Default: 0.5.
    pub smoothing: f32,
}

impl Default for EnergyEngineConfig {
    fn default() -> Self {
        Self {
            floor_dbfs: -60.0,
            ceil_dbfs: -20.0,
            smoothing: 0.5,
        }
    }
}

/// Energy-based reference engine.
#[derive(Debug, Clone, Default)]
pub struct EnergyEngine {
    config: EnergyEngineConfig,
}

impl EnergyEngine {
    pub fn new(config: EnergyEngineConfig) -> Self {
        Self { config }
    }

    /// Root-mean-square of int16 samples, normalised so full scale is 1.0.
    fn rms(samples: &[i16]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = samples
            .iter()
            .map(|&s| {
                let v = s as f64 / 32768.0;
                v * v
            })
            .sum();
        (sum_sq / samples.len() as f64).sqrt() as f32
    }

    fn level_to_probability(&self, rms: f32) -> f32 {
        if rms <= 0.0 {
            return 0.0;
        }
        let dbfs = 20.0 * rms.log10();
        let span = self.config.ceil_dbfs - self.config.floor_dbfs;
        ((dbfs - self.config.floor_dbfs) / span).clamp(0.0, 1.0)
    }
}

impl VadEngine for EnergyEngine {
    fn name(&self) -> &str {
        "energy"
    }

    fn create(
        &self,
        hop_size: usize,
        threshold: f32,
    ) -> std::result::Result<Box<dyn EngineInstance>, StatusCode> {
        let smoothing_ok = (0.0..1.0).contains(&self.config.smoothing);
        let span_ok = self.config.ceil_dbfs > self.config.floor_dbfs;
        if hop_size == 0 || !(0.0..=1.0).contains(&threshold) || !smoothing_ok || !span_ok {
            return Err(EngineStatus::InvalidParam.code());
        }
        debug!(hop_size, threshold, "energy engine instance created");
        Ok(Box::new(EnergyInstance {
            engine: self.clone(),
            hop_size,
            threshold,
            smoothed: 0.0,
            destroyed: false,
        }))
    }

    fn version(&self) -> Option<String> {
        Some(format!("energy-{}", env!("CARGO_PKG_VERSION")))
    }
}

struct EnergyInstance {
    engine: EnergyEngine,
    hop_size: usize,
    threshold: f32,
    smoothed: f32,
    destroyed: bool,
}

impl EngineInstance for EnergyInstance {
    fn process(&mut self, samples: &[i16]) -> std::result::Result<EngineOutput, StatusCode> {
        if self.destroyed {
            return Err(EngineStatus::InvalidState.code());
        }
        if samples.len() != self.hop_size {
            return Err(EngineStatus::InvalidParam.code());
        }
        let raw = self.engine.level_to_probability(EnergyEngine::rms(samples));
        let alpha = self.engine.config.smoothing;
        self.smoothed = alpha * self.smoothed + (1.0 - alpha) * raw;
        Ok(EngineOutput {
            probability: self.smoothed,
            flag: i32::from(self.smoothed >= self.threshold),
        })
    }

    fn destroy(&mut self) -> std::result::Result<(), StatusCode> {
        self.destroyed = true;
        Ok(())
    }
}
