//! `DetectorHandle`: one engine state bound to one stream configuration.
//!
//! ## Lifecycle
//!
//! ```text
//! DetectorHandle::create()   → engine.create(), state = Ready
//!     └─► process() ...      → engine.process(), handle stays Ready on failure
//!         └─► destroy()      → engine.destroy(), state = Destroyed (terminal)
//! ```
//!
//! Creation failure never yields a handle. `process` on a destroyed handle
//! fails with `VadError::HandleDestroyed`; `destroy` on a destroyed handle is
//! a no-op. Dropping a `Ready` handle releases it and logs any failure.

pub mod config;

pub use config::{StreamConfig, DEFAULT_HOP_SIZE, DEFAULT_THRESHOLD};

use tracing::{debug, error, warn};

use crate::{
    engine::{EngineInstance, EngineStatus, VadEngine},
    error::{Result, VadError},
    events::{VadFlag, VadOutput},
    frame::Frame,
};

enum HandleState {
    Ready(Box<dyn EngineInstance>),
    Destroyed,
}

/// Exclusively owned engine state for one audio stream.
pub struct DetectorHandle {
    config: StreamConfig,
    engine_name: String,
    state: HandleState,
    /// Frames where the engine's own flag differed from the threshold policy.
    flag_disagreements: u64,
}

impl DetectorHandle {
    /// Allocate engine state for `config`.
    ///
    /// # Errors
    /// - `VadError::InvalidConfig` if `config` fails validation.
    /// - `VadError::HandleCreationFailed` if the engine reports a non-zero status.
    pub fn create(engine: &dyn VadEngine, config: StreamConfig) -> Result<Self> {
        config.validate()?;
        match engine.create(config.hop_size(), config.threshold()) {
            Ok(instance) => {
                debug!(
                    engine = engine.name(),
                    hop_size = config.hop_size(),
                    threshold = config.threshold(),
                    "detector handle created"
                );
                Ok(Self {
                    config,
                    engine_name: engine.name().to_string(),
                    state: HandleState::Ready(instance),
                    flag_disagreements: 0,
                })
            }
            Err(code) => {
                error!(
                    "failed to create handler, error code: {code} ({})",
                    EngineStatus::from_code(code)
                );
                Err(VadError::HandleCreationFailed { code })
            }
        }
    }

    pub fn config(&self) -> StreamConfig {
        self.config
    }

    pub fn engine_name(&self) -> &str {
        &self.engine_name
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, HandleState::Ready(_))
    }

    /// Number of frames whose engine flag disagreed with `probability >= threshold`.
    pub fn flag_disagreements(&self) -> u64 {
        self.flag_disagreements
    }

    /// Run one validated frame through the engine.
    ///
    /// The returned flag is recomputed from the probability with the
    /// handle's threshold (`probability >= threshold`).
    ///
    /// # Errors
    /// - `VadError::HandleDestroyed` after `destroy()`.
    /// - `VadError::InvalidShape` if the frame does not match the hop size.
    /// - `VadError::ProcessingFailed` on a non-zero engine status; the handle
    ///   stays usable.
    pub fn process(&mut self, frame: &Frame) -> Result<VadOutput> {
        let HandleState::Ready(instance) = &mut self.state else {
            return Err(VadError::HandleDestroyed);
        };
        if frame.len() != self.config.hop_size() {
            return Err(VadError::InvalidShape {
                expected: self.config.hop_size(),
                actual: frame.len(),
                shape: vec![frame.len()],
            });
        }

        let raw = instance.process(frame.samples()).map_err(|code| {
            error!(
                "process failed, error code: {code} ({})",
                EngineStatus::from_code(code)
            );
            VadError::ProcessingFailed { code }
        })?;

        let probability = if raw.probability.is_nan() {
            warn!("engine returned NaN probability; treating as 0");
            0.0
        } else {
            raw.probability.clamp(0.0, 1.0)
        };
        let flag = VadFlag::from_probability(probability, self.config.threshold());
        if raw.flag != flag.as_i32() {
            self.flag_disagreements += 1;
            // First disagreement per handle at warn, the rest at debug.
            if self.flag_disagreements == 1 {
                warn!(
                    engine_flag = raw.flag,
                    probability,
                    threshold = self.config.threshold(),
                    "engine flag disagrees with threshold policy; using threshold policy"
                );
            } else {
                debug!(engine_flag = raw.flag, probability, "engine flag disagrees");
            }
        }
        Ok(VadOutput { probability, flag })
    }

    /// Release the engine state.
    ///
    /// # Errors
    /// `VadError::HandleDestructionFailed` if the engine reports a non-zero
    /// status. The handle is `Destroyed` afterwards either way.
    pub fn destroy(&mut self) -> Result<()> {
        let state = std::mem::replace(&mut self.state, HandleState::Destroyed);
        let HandleState::Ready(mut instance) = state else {
            return Ok(());
        };
        match instance.destroy() {
            Ok(()) => {
                debug!(engine = %self.engine_name, "detector handle destroyed");
                Ok(())
            }
            Err(code) => {
                error!(
                    "failed to destroy handler, error code: {code} ({})",
                    EngineStatus::from_code(code)
                );
                Err(VadError::HandleDestructionFailed { code })
            }
        }
    }
}

impl Drop for DetectorHandle {
    fn drop(&mut self) {
        if let Err(e) = self.destroy() {
            warn!("detector handle released with error on drop: {e}");
        }
    }
}

impl std::fmt::Debug for DetectorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorHandle")
            .field("config", &self.config)
            .field("engine", &self.engine_name)
            .field("ready", &self.is_ready())
            .finish()
    }
}
