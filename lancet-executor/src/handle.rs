//! Worker handle — one live, killable worker process.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A handle to one running worker process.
///
/// Handles are created per attempt and torn down with the attempt;
/// no worker is ever reused across snippets. The child is spawned with
/// `kill_on_drop`, so dropping the handle also reclaims the process.
#[derive(Debug)]
#[non_exhaustive]
pub struct WorkerHandle {
    /// Unique identifier for this worker instance.
    pub id: Uuid,

    /// The worker child process.
    pub child: tokio::process::Child,

    /// Timestamp when the worker was spawned.
    pub spawned_at: DateTime<Utc>,
}

impl WorkerHandle {
    /// Create a new worker handle.
    #[must_use]
    pub fn new(id: Uuid, child: tokio::process::Child) -> Self {
        Self { id, child, spawned_at: Utc::now() }
    }

    /// Force-kill the worker and wait for full reclamation.
    ///
    /// Idempotent: killing an already-finished worker is not an error.
    ///
    /// # Errors
    /// Returns an I/O error only when the kill signal itself cannot be
    /// delivered to a live process.
    pub async fn kill(&mut self) -> std::io::Result<()> {
        match self.child.kill().await {
            Ok(()) => Ok(()),
            // Already exited: reclamation below still runs.
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(e),
        }
    }
}
