//! Per-plan operator log sink

use std::sync::{Arc, Mutex};

use tracing::info;

/// Caller-supplied sink for one plan's log lines
///
/// Each line is mirrored through `tracing` (which prefixes the timestamp for
/// operator display) and accumulated raw for the run record. Clones share
/// the same buffer, so the coordinator can hand one sink to several
/// executors within a plan.
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    lines: Arc<Mutex<Vec<String>>>,
}

impl RunLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, line: impl Into<String>) {
        let line = line.into();
        info!(target: "packferry::run", "{line}");
        self.lines.lock().expect("run log lock poisoned").push(line);
    }

    /// Drain the accumulated lines for persistence
    #[must_use]
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock().expect("run log lock poisoned"))
    }

    /// Copy of the lines collected so far
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("run log lock poisoned").clone()
    }
}
