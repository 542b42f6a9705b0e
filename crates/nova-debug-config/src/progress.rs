//! Cancellation and progress tracking for one resolution attempt.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Host-side progress UI. Calls are notifications; none of them may block.
pub trait ProgressSink: Send + Sync {
    fn begin(&self, id: &str, title: &str, cancellable: bool);
    fn report(&self, id: &str, phase: &str, message: &str);
    fn end(&self, id: &str);
}

/// A sink that drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn begin(&self, _id: &str, _title: &str, _cancellable: bool) {}
    fn report(&self, _id: &str, _phase: &str, _message: &str) {}
    fn end(&self, _id: &str) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressState {
    Created,
    Observing,
    Cancelled,
    Completed,
}

pub struct ProgressReporter {
    id: String,
    token: CancellationToken,
    external: Mutex<Option<CancellationToken>>,
    state: Mutex<ProgressState>,
    sink: Arc<dyn ProgressSink>,
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("id", &self.id)
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl ProgressReporter {
    pub fn new(id: impl Into<String>, title: &str, sink: Arc<dyn ProgressSink>) -> Self {
        let id = id.into();
        sink.begin(&id, title, true);
        Self {
            id,
            token: CancellationToken::new(),
            external: Mutex::new(None),
            state: Mutex::new(ProgressState::Created),
            sink,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> ProgressState {
        let mut state = self.state.lock();
        if *state == ProgressState::Observing && self.is_cancelled() {
            *state = ProgressState::Cancelled;
        }
        *state
    }

    /// Ties this reporter to an external cancellation source.
    pub fn observe(&self, signal: &CancellationToken) {
        let mut state = self.state.lock();
        if *state == ProgressState::Created {
            *state = ProgressState::Observing;
        }
        *self.external.lock() = Some(signal.clone());
    }

    /// Once true, stays true.
    pub fn is_cancelled(&self) -> bool {
        if self.token.is_cancelled() {
            return true;
        }
        let cancelled_externally = self
            .external
            .lock()
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled);
        if cancelled_externally {
            self.token.cancel();
        }
        cancelled_externally
    }

    pub fn report(&self, phase: &str, message: &str) {
        if self.is_cancelled() {
            return;
        }
        self.sink.report(&self.id, phase, message);
    }

    pub fn cancel(&self) {
        self.token.cancel();
        let mut state = self.state.lock();
        if matches!(*state, ProgressState::Created | ProgressState::Observing) {
            *state = ProgressState::Cancelled;
        }
    }

    /// Ends the UI. Idempotent; only the first call notifies the sink.
    pub fn dispose(&self) {
        {
            let mut state = self.state.lock();
            if *state == ProgressState::Completed {
                return;
            }
            *state = ProgressState::Completed;
        }
        self.token.cancel();
        self.sink.end(&self.id);
    }
}

/// Disposes the reporter when dropped, whichever way resolution exits.
pub struct ProgressGuard {
    reporter: Arc<ProgressReporter>,
}

impl ProgressGuard {
    pub fn new(reporter: Arc<ProgressReporter>) -> Self {
        Self { reporter }
    }
}

impl std::ops::Deref for ProgressGuard {
    type Target = ProgressReporter;

    fn deref(&self) -> &ProgressReporter {
        &self.reporter
    }
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        self.reporter.dispose();
    }
}

/// Reporters created ahead of a resolution (e.g. by a "Run" code lens) and
/// correlated with it through the configuration's `__progressId`.
pub struct ProgressRegistry {
    next_id: AtomicU64,
    pending: Mutex<HashMap<String, Arc<ProgressReporter>>>,
    sink: Arc<dyn ProgressSink>,
}

impl ProgressRegistry {
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
            sink,
        }
    }

    fn next_id(&self) -> String {
        format!("java-debug-{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Creates a reporter that is not registered for correlation.
    pub fn create_detached(&self, title: &str) -> Arc<ProgressReporter> {
        Arc::new(ProgressReporter::new(self.next_id(), title, self.sink.clone()))
    }

    /// Creates a reporter that a later resolution can pick up by id.
    pub fn create(&self, title: &str) -> Arc<ProgressReporter> {
        let reporter = self.create_detached(title);
        self.pending
            .lock()
            .insert(reporter.id().to_string(), reporter.clone());
        reporter
    }

    /// Removes and returns the reporter registered under `id`.
    pub fn take(&self, id: &str) -> Option<Arc<ProgressReporter>> {
        self.pending.lock().remove(id)
    }
}
