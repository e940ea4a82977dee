//! Arrival-order admission to a stream's detector handle.
//!
//! Every operation that touches the handle first reserves a [`Turn`] on the
//! caller's thread or task, then waits for it before locking the handle.
//! Turns are served strictly in reservation order, so a frame reserved
//! before another reaches the engine first, even when the earlier one is
//! still running on a blocking worker whose caller has timed out.
//!
//! A turn is finished when it is dropped, whether or not it ever ran. A
//! worker that panics or is discarded at runtime shutdown therefore never
//! blocks later turns.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct TurnState {
    next: u64,
    serving: u64,
    /// Finished turns that are ahead of `serving`.
    finished: BTreeSet<u64>,
}

#[derive(Debug, Default)]
pub(crate) struct TurnQueue {
    state: Mutex<TurnState>,
    advanced: Condvar,
}

impl TurnQueue {
    pub(crate) fn reserve(self: &Arc<Self>) -> Turn {
        let mut state = self.state.lock();
        let id = state.next;
        state.next += 1;
        Turn {
            queue: Arc::clone(self),
            id,
        }
    }

    fn wait_for(&self, id: u64) {
        let mut state = self.state.lock();
        while state.serving != id {
            self.advanced.wait(&mut state);
        }
    }

    fn finish(&self, id: u64) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.finished.insert(id);
        while state.finished.remove(&state.serving) {
            state.serving += 1;
        }
        drop(guard);
        self.advanced.notify_all();
    }

    #[cfg(test)]
    fn serving(&self) -> u64 {
        self.state.lock().serving
    }
}

/// A reserved position in a [`TurnQueue`]. Finishes on drop.
#[derive(Debug)]
pub(crate) struct Turn {
    queue: Arc<TurnQueue>,
    id: u64,
}

impl Turn {
    /// Block until every earlier turn has finished.
    pub(crate) fn wait(&self) {
        self.queue.wait_for(self.id);
    }
}

impl Drop for Turn {
    fn drop(&mut self) {
        self.queue.finish(self.id);
    }
}
