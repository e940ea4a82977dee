use std::sync::atomic::{AtomicUsize, Ordering};

/// Per-stream counters, updated lock-free from any thread.
#[derive(Debug, Default)]
pub struct StreamDiagnostics {
    pub frames_in: AtomicUsize,
    pub frames_rejected: AtomicUsize,
    pub frames_processed: AtomicUsize,
    pub speech_frames: AtomicUsize,
    pub processing_errors: AtomicUsize,
    pub observer_errors: AtomicUsize,
    pub handle_replacements: AtomicUsize,
    pub timeouts: AtomicUsize,
}

impl StreamDiagnostics {
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            frames_in: self.frames_in.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            speech_frames: self.speech_frames.load(Ordering::Relaxed),
            processing_errors: self.processing_errors.load(Ordering::Relaxed),
            observer_errors: self.observer_errors.load(Ordering::Relaxed),
            handle_replacements: self.handle_replacements.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticsSnapshot {
    pub frames_in: usize,
    pub frames_rejected: usize,
    pub frames_processed: usize,
    pub speech_frames: usize,
    pub processing_errors: usize,
    pub observer_errors: usize,
    pub handle_replacements: usize,
    pub timeouts: usize,
}
