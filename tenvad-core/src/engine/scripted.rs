//! Test engine whose outputs and failures are scripted up front.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{EngineInstance, EngineOutput, StatusCode, VadEngine};

#[derive(Default)]
pub(crate) struct Script {
    pub probabilities: VecDeque<f32>,
    pub process_failures: VecDeque<StatusCode>,
    pub create_failure: Option<StatusCode>,
    pub destroy_failure: Option<StatusCode>,
    /// Flag reported instead of `probability >= threshold`.
    pub flag_override: Option<i32>,
    /// Hop sizes and thresholds passed to `create`, in order.
    pub created: Vec<(usize, f32)>,
    /// First sample of every frame that reached `process`, in order.
    pub seen: Vec<i16>,
}

#[derive(Clone, Default)]
pub(crate) struct ScriptedEngine {
    pub script: Arc<Mutex<Script>>,
    pub process_calls: Arc<AtomicUsize>,
    pub destroy_calls: Arc<AtomicUsize>,
}

impl ScriptedEngine {
    pub fn with_probabilities(probs: &[f32]) -> Self {
        let engine = Self::default();
        engine.script.lock().probabilities = probs.iter().copied().collect();
        engine
    }

    pub fn process_calls(&self) -> usize {
        self.process_calls.load(Ordering::SeqCst)
    }

    pub fn destroy_calls(&self) -> usize {
        self.destroy_calls.load(Ordering::SeqCst)
    }
}

struct ScriptedInstance {
    engine: ScriptedEngine,
    threshold: f32,
}

impl VadEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    fn create(
        &self,
        hop_size: usize,
        threshold: f32,
    ) -> std::result::Result<Box<dyn EngineInstance>, StatusCode> {
        let mut script = self.script.lock();
        script.created.push((hop_size, threshold));
        if let Some(code) = script.create_failure {
            return Err(code);
        }
        Ok(Box::new(ScriptedInstance {
            engine: self.clone(),
            threshold,
        }))
    }
}

impl EngineInstance for ScriptedInstance {
    fn process(&mut self, samples: &[i16]) -> std::result::Result<EngineOutput, StatusCode> {
        self.engine.process_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.engine.script.lock();
        script.seen.push(samples.first().copied().unwrap_or_default());
        if let Some(code) = script.process_failures.pop_front() {
            if code != 0 {
                return Err(code);
            }
        }
        let probability = script.probabilities.pop_front().unwrap_or(0.0);
        let flag = script
            .flag_override
            .unwrap_or_else(|| i32::from(probability >= self.threshold));
        Ok(EngineOutput { probability, flag })
    }

    fn destroy(&mut self) -> std::result::Result<(), StatusCode> {
        self.engine.destroy_calls.fetch_add(1, Ordering::SeqCst);
        match self.engine.script.lock().destroy_failure {
            Some(code) => Err(code),
            None => Ok(()),
        }
    }
}
