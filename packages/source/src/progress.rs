//! Stage progress for a pipeline run.
//!
//! A run reports one unit per source it processes: the boundary file,
//! then each point and tabular source, then the metrics pass. The
//! [`ProgressCallback`] trait lets the CLI draw that as a bar while
//! library callers and tests pass [`NullProgress`].

use std::sync::Arc;

/// Receives stage updates from the pipeline orchestrator.
///
/// Shared as `Arc<dyn ProgressCallback>`, hence `Send + Sync`.
pub trait ProgressCallback: Send + Sync {
    /// Number of stages the run will report.
    fn set_total(&self, total: u64);

    /// Marks `delta` stages as done.
    fn inc(&self, delta: u64);

    /// Names the stage currently running.
    fn set_message(&self, msg: String);

    /// Ends the run with a status line.
    fn finish(&self, msg: String);
}

/// Discards every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// A [`NullProgress`] behind the shared callback type.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
