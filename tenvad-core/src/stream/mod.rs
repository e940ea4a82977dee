//! `VadStream`: ordered, per-stream frame processing.
//!
//! ## Per-frame flow
//!
//! ```text
//! process(input) ─► FrameValidator ─► Mutex<DetectorHandle> ─► threshold policy
//!                                                                   │
//!                                     broadcast FrameEvent ◄────────┤
//!                                     VadObserver::on_frame ◄───────┘
//! ```
//!
//! ## Ordering
//!
//! Every operation on the handle (`process`, `process_async`, `set_threshold`,
//! `close`) reserves a turn on the caller's thread or task before anything is
//! scheduled, and turns are served in reservation order. The engine therefore
//! sees frames in submission order, including after a `process_async` timeout
//! whose worker is still running. Independent streams never contend.
//!
//! ## Threshold changes
//!
//! `set_threshold` destroys the current handle and creates a new one with the
//! same hop size, so engine smoothing state starts over.

pub mod diagnostics;
pub mod observer;
mod turns;

pub use diagnostics::{DiagnosticsSnapshot, StreamDiagnostics};
pub use observer::VadObserver;

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::{
    detector::{config::validate_threshold, DetectorHandle, StreamConfig},
    engine::EngineRef,
    error::{Result, VadError},
    events::{FrameEvent, VadOutput},
    frame::{AudioInput, Frame, FrameValidator},
};
use turns::TurnQueue;

/// Broadcast channel capacity: frame events buffered for slow subscribers.
const EVENT_CAP: usize = 256;

/// Behavioural knobs that do not affect the engine itself.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Copy non-contiguous input instead of rejecting it. Default: `true`.
    pub normalize_layout: bool,
    /// Upper bound on how long `process_async` waits for the engine.
    /// `None` waits indefinitely. Default: `None`.
    pub process_timeout: Option<Duration>,
    /// Frame events buffered per subscriber. Default: 256.
    pub event_capacity: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            normalize_layout: true,
            process_timeout: None,
            event_capacity: EVENT_CAP,
        }
    }
}

type SharedHandle = Arc<Mutex<Option<DetectorHandle>>>;

/// One logical audio stream bound to one engine.
///
/// `VadStream` is `Send + Sync`; wrap it in `Arc` to submit frames from
/// async tasks.
pub struct VadStream {
    engine: EngineRef,
    validator: FrameValidator,
    options: StreamOptions,
    /// `None` once closed, or after a failed handle replacement.
    handle: SharedHandle,
    turns: Arc<TurnQueue>,
    observer: Option<Arc<dyn VadObserver>>,
    events_tx: broadcast::Sender<FrameEvent>,
    /// Next event sequence number, taken under the handle lock.
    seq: Arc<AtomicU64>,
    diagnostics: Arc<StreamDiagnostics>,
}

impl VadStream {
    /// Open a stream with default options and no observer.
    ///
    /// # Errors
    /// - `VadError::InvalidConfig` if `config` is invalid.
    /// - `VadError::HandleCreationFailed` if the engine cannot allocate state.
    pub fn new(engine: EngineRef, config: StreamConfig) -> Result<Self> {
        Self::open(engine, config, StreamOptions::default(), None)
    }

    /// Open a stream whose results are also delivered to `observer`.
    pub fn with_observer(
        engine: EngineRef,
        config: StreamConfig,
        observer: impl VadObserver,
    ) -> Result<Self> {
        Self::open(
            engine,
            config,
            StreamOptions::default(),
            Some(Arc::new(observer)),
        )
    }

    pub fn open(
        engine: EngineRef,
        config: StreamConfig,
        options: StreamOptions,
        observer: Option<Arc<dyn VadObserver>>,
    ) -> Result<Self> {
        let handle = DetectorHandle::create(&*engine, config)?;

        let mut validator = FrameValidator::new(config.hop_size());
        if !options.normalize_layout {
            validator = validator.strict_layout();
        }
        let (events_tx, _) = broadcast::channel(options.event_capacity.max(1));

        info!(
            engine = engine.name(),
            hop_size = config.hop_size(),
            threshold = config.threshold(),
            "VAD stream opened"
        );

        Ok(Self {
            engine,
            validator,
            options,
            handle: Arc::new(Mutex::new(Some(handle))),
            turns: Arc::new(TurnQueue::default()),
            observer,
            events_tx,
            seq: Arc::new(AtomicU64::new(0)),
            diagnostics: Arc::new(StreamDiagnostics::default()),
        })
    }

    /// Validate and process one frame on the calling thread.
    ///
    /// # Errors
    /// - `InvalidShape` / `InvalidType` / `NotAContiguousBuffer` for a bad frame
    ///   (the engine is not called).
    /// - `HandleDestroyed` after `close()`.
    /// - `ProcessingFailed` on engine failure; the stream stays usable.
    /// - `Observer` if the observer rejects the result.
    pub fn process<'a>(&self, input: impl Into<AudioInput<'a>>) -> Result<VadOutput> {
        let frame = self.admit(input)?;
        let turn = self.turns.reserve();
        turn.wait();
        let (seq, output) = run_frame(&self.handle, &frame, &self.seq, &self.diagnostics)?;
        drop(turn);
        self.notify(seq, &output)?;
        Ok(output)
    }

    /// Validate on the caller's task, then run the engine call on the
    /// blocking thread pool.
    ///
    /// The frame's turn is reserved before the worker is spawned. Dropping
    /// the returned future does not cancel the engine call; it completes and
    /// its result is discarded. With a `process_timeout` configured, the wait
    /// fails with `VadError::Timeout`; later frames still run after this one.
    pub async fn process_async<'a>(
        &self,
        input: impl Into<AudioInput<'a>>,
    ) -> Result<VadOutput> {
        let frame = self.admit(input)?;
        let turn = self.turns.reserve();
        let handle = Arc::clone(&self.handle);
        let seq = Arc::clone(&self.seq);
        let diagnostics = Arc::clone(&self.diagnostics);
        let worker = tokio::task::spawn_blocking(move || {
            turn.wait();
            run_frame(&handle, &frame, &seq, &diagnostics)
        });

        let joined = match self.options.process_timeout {
            Some(limit) => match tokio::time::timeout(limit, worker).await {
                Ok(joined) => joined,
                Err(_) => {
                    StreamDiagnostics::bump(&self.diagnostics.timeouts);
                    warn!("frame processing exceeded {:?}", limit);
                    return Err(VadError::Timeout { elapsed: limit });
                }
            },
            None => worker.await,
        };

        let (seq, output) = joined.map_err(|e| {
            error!("VAD worker failed: {e}");
            VadError::WorkerPanicked
        })??;
        self.notify(seq, &output)?;
        Ok(output)
    }

    /// Replace the detector handle with one using `threshold`.
    ///
    /// # Errors
    /// - `InvalidConfig` if `threshold ∉ [0, 1]`; the current handle is kept.
    /// - `HandleDestroyed` if the stream is closed.
    /// - `HandleCreationFailed` if the new handle cannot be created; the
    ///   stream has no live handle afterwards.
    /// - `HandleDestructionFailed` if releasing the old handle failed; the new
    ///   handle is installed regardless.
    ///
    /// When both fail, `HandleCreationFailed` is returned and the release
    /// failure is logged.
    pub fn set_threshold(&self, threshold: f32) -> Result<()> {
        validate_threshold(threshold)?;

        let turn = self.turns.reserve();
        turn.wait();
        let mut guard = self.handle.lock();
        let config = guard
            .as_ref()
            .ok_or(VadError::HandleDestroyed)?
            .config()
            .with_threshold(threshold)?;

        let released = match guard.take() {
            Some(mut old) => old.destroy(),
            None => Ok(()),
        };
        let replacement = match DetectorHandle::create(&*self.engine, config) {
            Ok(handle) => handle,
            Err(e) => {
                if let Err(release) = released {
                    error!("previous detector handle also failed to release: {release}");
                }
                return Err(e);
            }
        };
        *guard = Some(replacement);
        drop(guard);
        drop(turn);

        StreamDiagnostics::bump(&self.diagnostics.handle_replacements);
        info!(threshold, "threshold updated; detector handle replaced");
        released
    }

    /// Destroy the detector handle. Later `process`/`set_threshold` calls fail
    /// with `HandleDestroyed`; closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        let turn = self.turns.reserve();
        turn.wait();
        let taken = self.handle.lock().take();
        drop(turn);
        match taken {
            Some(mut handle) => {
                info!(engine = self.engine.name(), "VAD stream closed");
                handle.destroy()
            }
            None => Ok(()),
        }
    }

    pub fn is_open(&self) -> bool {
        self.handle.lock().is_some()
    }

    /// Current configuration.
    pub fn config(&self) -> Result<StreamConfig> {
        self.handle
            .lock()
            .as_ref()
            .map(DetectorHandle::config)
            .ok_or(VadError::HandleDestroyed)
    }

    pub fn hop_size(&self) -> usize {
        self.validator.hop_size()
    }

    pub fn threshold(&self) -> Result<f32> {
        self.config().map(|c| c.threshold())
    }

    pub fn engine(&self) -> &EngineRef {
        &self.engine
    }

    /// Subscribe to frame events.
    pub fn subscribe(&self) -> broadcast::Receiver<FrameEvent> {
        self.events_tx.subscribe()
    }

    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    fn admit<'a>(&self, input: impl Into<AudioInput<'a>>) -> Result<Frame> {
        StreamDiagnostics::bump(&self.diagnostics.frames_in);
        self.validator.validate(input).inspect_err(|e| {
            StreamDiagnostics::bump(&self.diagnostics.frames_rejected);
            debug!("frame rejected: {e}");
        })
    }

    fn notify(&self, seq: u64, output: &VadOutput) -> Result<()> {
        let _ = self.events_tx.send(FrameEvent::new(seq, output));

        if let Some(observer) = &self.observer {
            observer.on_frame(output).map_err(|e| {
                StreamDiagnostics::bump(&self.diagnostics.observer_errors);
                VadError::Observer(e)
            })?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for VadStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VadStream")
            .field("engine", &self.engine)
            .field("hop_size", &self.validator.hop_size())
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

/// One engine call under the stream lock. Returns the event sequence number
/// assigned to a successful frame.
fn run_frame(
    handle: &Mutex<Option<DetectorHandle>>,
    frame: &Frame,
    seq: &AtomicU64,
    diagnostics: &StreamDiagnostics,
) -> Result<(u64, VadOutput)> {
    let mut guard = handle.lock();
    let detector = guard.as_mut().ok_or(VadError::HandleDestroyed)?;
    match detector.process(frame) {
        Ok(output) => {
            StreamDiagnostics::bump(&diagnostics.frames_processed);
            if output.is_speech() {
                StreamDiagnostics::bump(&diagnostics.speech_frames);
            }
            Ok((seq.fetch_add(1, Ordering::SeqCst), output))
        }
        Err(e) => {
            if matches!(e, VadError::ProcessingFailed { .. }) {
                StreamDiagnostics::bump(&diagnostics.processing_errors);
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::scripted::ScriptedEngine;
    use crate::engine::EnergyEngine;
    use crate::events::VadFlag;

    fn scripted_stream(probs: &[f32]) -> (ScriptedEngine, VadStream) {
        let engine = ScriptedEngine::with_probabilities(probs);
        let stream =
            VadStream::new(EngineRef::new(engine.clone()), StreamConfig::default()).unwrap();
        (engine, stream)
    }

    #[test]
    fn silence_yields_low_probability() {
        let stream =
            VadStream::new(EngineRef::new(EnergyEngine::default()), StreamConfig::default())
                .unwrap();
        let out = stream.process(&[0i16; 256]).unwrap();
        assert!(out.probability < 0.5);
        assert_eq!(out.flag, VadFlag::Silence);
    }

    #[test]
    fn bad_frames_never_reach_engine() {
        let (engine, stream) = scripted_stream(&[]);

        let short = vec![0i16; 255];
        assert!(matches!(
            stream.process(&short),
            Err(VadError::InvalidShape { .. })
        ));
        let floats = vec![0.0f32; 256];
        assert!(matches!(
            stream.process(&floats),
            Err(VadError::InvalidType { .. })
        ));

        assert_eq!(engine.process_calls(), 0);
        let diag = stream.diagnostics();
        assert_eq!(diag.frames_in, 2);
        assert_eq!(diag.frames_rejected, 2);
    }

    #[test]
    fn set_threshold_changes_later_flags() {
        let (engine, stream) = scripted_stream(&[0.7, 0.7]);
        assert_eq!(stream.process(&[0i16; 256]).unwrap().flag, VadFlag::Speech);

        stream.set_threshold(0.9).unwrap();
        assert_eq!(stream.threshold().unwrap(), 0.9);
        assert_eq!(stream.process(&[0i16; 256]).unwrap().flag, VadFlag::Silence);

        assert_eq!(engine.script.lock().created, vec![(256, 0.5), (256, 0.9)]);
        assert_eq!(engine.destroy_calls(), 1);
        assert_eq!(stream.diagnostics().handle_replacements, 1);
    }

    #[test]
    fn invalid_threshold_keeps_current_handle() {
        let (engine, stream) = scripted_stream(&[]);
        let err = stream.set_threshold(1.5).unwrap_err();
        assert!(matches!(err, VadError::InvalidConfig(_)));
        assert_eq!(engine.script.lock().created.len(), 1);
        assert_eq!(engine.destroy_calls(), 0);
        assert_eq!(stream.threshold().unwrap(), 0.5);
    }

    #[test]
    fn failed_replacement_leaves_no_live_handle() {
        let (engine, stream) = scripted_stream(&[0.9]);
        engine.script.lock().create_failure = Some(-2);

        let err = stream.set_threshold(0.3).unwrap_err();
        assert!(matches!(err, VadError::HandleCreationFailed { code: -2 }));
        assert!(!stream.is_open());
        assert!(matches!(
            stream.process(&[0i16; 256]),
            Err(VadError::HandleDestroyed)
        ));
    }

    #[test]
    fn old_handle_release_failure_is_reported_after_swap() {
        let (engine, stream) = scripted_stream(&[0.4]);
        engine.script.lock().destroy_failure = Some(-3);

        let err = stream.set_threshold(0.3).unwrap_err();
        assert!(matches!(err, VadError::HandleDestructionFailed { code: -3 }));
        engine.script.lock().destroy_failure = None;

        let out = stream.process(&[0i16; 256]).unwrap();
        assert_eq!(out.flag, VadFlag::Speech);
    }

    #[test]
    fn use_after_close_is_rejected() {
        let (engine, stream) = scripted_stream(&[]);
        stream.close().unwrap();
        stream.close().unwrap();
        assert_eq!(engine.destroy_calls(), 1);

        assert!(matches!(
            stream.process(&[0i16; 256]),
            Err(VadError::HandleDestroyed)
        ));
        assert!(matches!(
            stream.set_threshold(0.2),
            Err(VadError::HandleDestroyed)
        ));
        assert!(matches!(stream.config(), Err(VadError::HandleDestroyed)));
    }

    #[test]
    fn observer_sees_each_successful_frame_once() {
        let engine = ScriptedEngine::with_probabilities(&[0.2, 0.8]);
        engine.script.lock().process_failures = [0, -4].into_iter().collect();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let stream = VadStream::with_observer(
            EngineRef::new(engine.clone()),
            StreamConfig::default(),
            move |out: &VadOutput| -> anyhow::Result<()> {
                sink.lock().push(out.flag);
                Ok(())
            },
        )
        .unwrap();

        stream.process(&[0i16; 256]).unwrap();
        assert!(stream.process(&[0i16; 256]).is_err());
        stream.process(&[0i16; 256]).unwrap();

        assert_eq!(*seen.lock(), vec![VadFlag::Silence, VadFlag::Speech]);
    }

    #[test]
    fn observer_error_propagates_to_caller() {
        let engine = ScriptedEngine::with_probabilities(&[0.9]);
        let stream = VadStream::with_observer(
            EngineRef::new(engine),
            StreamConfig::default(),
            |_: &VadOutput| -> anyhow::Result<()> { Err(anyhow::anyhow!("sink full")) },
        )
        .unwrap();

        let err = stream.process(&[0i16; 256]).unwrap_err();
        assert!(matches!(err, VadError::Observer(_)));
        assert_eq!(stream.diagnostics().observer_errors, 1);
        assert_eq!(stream.diagnostics().frames_processed, 1);
    }

    #[test]
    fn subscribers_receive_sequenced_events() {
        let (_engine, stream) = scripted_stream(&[0.1, 0.95]);
        let mut rx = stream.subscribe();

        stream.process(&[0i16; 256]).unwrap();
        stream.process(&[0i16; 256]).unwrap();

        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        assert_eq!((first.seq, first.is_speech), (0, false));
        assert_eq!((second.seq, second.is_speech), (1, true));
    }

    #[tokio::test]
    async fn async_frames_keep_submission_order() {
        let (engine, stream) = scripted_stream(&[]);
        for i in 0..16i16 {
            let samples = vec![i; 256];
            stream.process_async(&samples).await.unwrap();
        }
        let expected: Vec<i16> = (0..16).collect();
        assert_eq!(engine.script.lock().seen, expected);
    }

    #[tokio::test]
    async fn async_validation_fails_before_scheduling() {
        let (engine, stream) = scripted_stream(&[]);
        let err = stream.process_async(&vec![0i16; 10]).await.unwrap_err();
        assert!(matches!(err, VadError::InvalidShape { .. }));
        assert_eq!(engine.process_calls(), 0);
    }

    #[test]
    fn creation_failure_wins_over_release_failure() {
        let (engine, stream) = scripted_stream(&[]);
        {
            let mut script = engine.script.lock();
            script.destroy_failure = Some(-3);
            script.create_failure = Some(-2);
        }

        let err = stream.set_threshold(0.3).unwrap_err();
        assert!(matches!(err, VadError::HandleCreationFailed { code: -2 }));
        assert!(!stream.is_open());
        assert_eq!(engine.destroy_calls(), 1);
    }

    #[tokio::test]
    async fn async_observer_sees_only_successful_frames() {
        let engine = ScriptedEngine::with_probabilities(&[0.8, 0.3]);
        engine.script.lock().process_failures = [0, -4].into_iter().collect();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let stream = VadStream::with_observer(
            EngineRef::new(engine),
            StreamConfig::default(),
            move |out: &VadOutput| -> anyhow::Result<()> {
                sink.lock().push(out.probability);
                Ok(())
            },
        )
        .unwrap();

        stream.process_async(&[0i16; 256]).await.unwrap();
        let err = stream.process_async(&[0i16; 256]).await.unwrap_err();
        assert!(matches!(err, VadError::ProcessingFailed { code: -4 }));

        assert_eq!(*seen.lock(), vec![0.8]);
    }

    #[tokio::test]
    async fn async_observer_error_propagates() {
        let stream = VadStream::with_observer(
            EngineRef::new(ScriptedEngine::with_probabilities(&[0.9])),
            StreamConfig::default(),
            |_: &VadOutput| -> anyhow::Result<()> { Err(anyhow::anyhow!("sink closed")) },
        )
        .unwrap();

        let err = stream.process_async(&[0i16; 256]).await.unwrap_err();
        assert!(matches!(err, VadError::Observer(_)));
        assert_eq!(stream.diagnostics().observer_errors, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn event_seq_matches_engine_order_under_contention() {
        let probs: Vec<f32> = (0..32).map(|i| i as f32 / 100.0).collect();
        let (_engine, stream) = scripted_stream(&probs);
        let stream = Arc::new(stream);
        let mut rx = stream.subscribe();

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let stream = Arc::clone(&stream);
                tokio::spawn(async move { stream.process_async(&[0i16; 256]).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let mut received = 0;
        while let Ok(event) = rx.try_recv() {
            // The k-th engine call returns probs[k].
            assert_eq!(event.probability, probs[event.seq as usize]);
            received += 1;
        }
        assert_eq!(received, 32);
    }

    #[tokio::test]
    async fn async_processing_failure_keeps_stream_usable() {
        let (engine, stream) = scripted_stream(&[0.6]);
        engine.script.lock().process_failures = [-4].into_iter().collect();

        let err = stream.process_async(&[0i16; 256]).await.unwrap_err();
        assert!(matches!(err, VadError::ProcessingFailed { code: -4 }));
        let out = stream.process_async(&[0i16; 256]).await.unwrap();
        assert_eq!(out.flag, VadFlag::Speech);
        assert_eq!(stream.diagnostics().processing_errors, 1);
    }
}
