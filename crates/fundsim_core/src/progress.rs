//! Progress reporting and cancellation for long-running work.
//!
//! A `RunProgress` is a cheap clonable handle: clones share the same
//! counters and cancellation flag, so a caller can keep one copy to watch or
//! cancel while the engine works with another. Reporting is advisory only;
//! the engine behaves identically when no handle is supplied.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Step callback: (percent complete in `[0, 100]`, description of the step)
pub type ProgressCallback = Arc<dyn Fn(f64, &str) + Send + Sync>;

#[derive(Clone)]
pub struct RunProgress {
    /// Trials completed across every simulation run so far
    trials_completed: Arc<AtomicUsize>,
    cancelled: Arc<AtomicBool>,
    callback: Option<ProgressCallback>,
}

impl RunProgress {
    #[must_use]
    pub fn new() -> Self {
        Self {
            trials_completed: Arc::new(AtomicUsize::new(0)),
            cancelled: Arc::new(AtomicBool::new(false)),
            callback: None,
        }
    }

    /// Create a handle that forwards step reports to `callback`
    #[must_use]
    pub fn with_callback(callback: impl Fn(f64, &str) + Send + Sync + 'static) -> Self {
        Self::new().on_step(callback)
    }

    /// Replace the step callback
    #[must_use]
    pub fn on_step(mut self, callback: impl Fn(f64, &str) + Send + Sync + 'static) -> Self {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Create from an existing cancellation flag (for worker integration)
    #[must_use]
    pub fn from_flag(cancelled: Arc<AtomicBool>) -> Self {
        Self {
            cancelled,
            ..Self::new()
        }
    }

    #[must_use]
    pub fn trials_completed(&self) -> usize {
        self.trials_completed.load(Ordering::Relaxed)
    }

    pub(crate) fn add_trials(&self, n: usize) {
        self.trials_completed.fetch_add(n, Ordering::Relaxed);
    }

    /// Report a finished step to the callback, if any
    pub fn report(&self, percent: f64, step: &str) {
        if let Some(cb) = &self.callback {
            cb(percent.clamp(0.0, 100.0), step);
        }
    }

    /// Request cancellation; the engine stops at its next check
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Shared cancellation flag, for timers or signal handlers
    #[must_use]
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }
}

impl Default for RunProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RunProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunProgress")
            .field("trials_completed", &self.trials_completed())
            .field("cancelled", &self.is_cancelled())
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_clones_share_state() {
        let progress = RunProgress::new();
        let watcher = progress.clone();

        progress.add_trials(25);
        assert_eq!(watcher.trials_completed(), 25);

        watcher.cancel();
        assert!(progress.is_cancelled());
    }

    #[test]
    fn test_callback_receives_clamped_percent() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress = RunProgress::with_callback(move |pct, step| {
            sink.lock().unwrap().push((pct, step.to_string()));
        });

        progress.report(50.0, "halfway");
        progress.report(140.0, "overshoot");

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0], (50.0, "halfway".to_string()));
        assert_eq!(seen[1].0, 100.0);
    }

    #[test]
    fn test_external_flag_cancels() {
        let flag = Arc::new(AtomicBool::new(false));
        let progress = RunProgress::from_flag(flag.clone());
        flag.store(true, Ordering::Relaxed);
        assert!(progress.is_cancelled());
        assert!(progress.cancel_flag().load(Ordering::Relaxed));
    }

    #[test]
    fn test_report_without_callback_is_noop() {
        RunProgress::new().report(10.0, "ignored");
    }
}
