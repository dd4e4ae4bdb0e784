//! The shared session transcript.

use std::sync::Arc;

use parking_lot::Mutex;

/// Append-only record of every raw protocol line exchanged, in both
/// directions, across every send on a mailer and its clones.
///
/// Cloning is shallow: all clones push to and observe the same lines, and
/// clearing from any clone clears for all. The lock is held only for the
/// duration of a single push, snapshot, or clear, never across I/O.
#[derive(Clone, Debug, Default)]
pub(crate) struct Transcript {
    lines: Arc<Mutex<Vec<String>>>,
}

impl Transcript {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends one protocol line.
    pub(crate) fn push(&self, line: impl Into<String>) {
        self.lines.lock().push(line.into());
    }

    /// A consistent snapshot of all lines appended so far.
    pub(crate) fn snapshot(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Empties the transcript, visibly to every clone.
    pub(crate) fn clear(&self) {
        self.lines.lock().clear();
    }
}
