//! Single-slot job state.
//!
//! Trigger surfaces (a scheduler, a status endpoint, the CLI) share one
//! [`JobSlot`] so that at most one sync pass runs at a time and the outcome
//! of the last one can be reported.

use crate::engine::{Report, Syncer};
use crate::error::Result;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use time::UtcDateTime;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobStatus {
    pub running: bool,
    pub last_finished: Option<UtcDateTime>,
    /// Message of the last pass's error; cleared by a successful pass.
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct JobSlot {
    state: Arc<Mutex<JobStatus>>,
}

impl JobSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, JobStatus> {
        // The state is plain data; a panic mid-update leaves nothing to repair.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the slot, unless a pass is already running.
    pub fn try_start(&self) -> Option<JobGuard> {
        let mut state = self.lock();
        if state.running {
            return None;
        }
        state.running = true;
        Some(JobGuard { slot: self.clone(), finished: false })
    }

    pub fn status(&self) -> JobStatus {
        self.lock().clone()
    }

    /// Run one pass in the slot.
    ///
    /// Returns `None` without doing anything if a pass is already running.
    pub async fn run(&self, syncer: &Syncer) -> Option<Result<Report>> {
        let Some(guard) = self.try_start() else {
            tracing::warn!("Sync already in progress; skipping");
            return None;
        };
        let result = syncer.sync().await;
        guard.finish(result.as_ref().err().map(|err| err.to_string()));
        Some(result)
    }
}

/// Proof of holding the slot. Releases it when finished or dropped.
#[derive(Debug)]
pub struct JobGuard {
    slot: JobSlot,
    finished: bool,
}

impl JobGuard {
    /// Record the pass outcome and release the slot.
    pub fn finish(mut self, error: Option<String>) {
        self.release(error);
    }

    fn release(&mut self, error: Option<String>) {
        let mut state = self.slot.lock();
        state.running = false;
        state.last_finished = Some(UtcDateTime::now());
        state.last_error = error;
        self.finished = true;
    }
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.release(Some("sync pass abandoned".to_string()));
        }
    }
}
