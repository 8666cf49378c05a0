//! Background task collaborator
//!
//! The core hands long-running bulk work (import, backup) to a task queue
//! and reports fractional progress through the returned handle. Whoever
//! owns the progress UI watches the handle; the core never renders.

use crate::error::{AppError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Write side of a task's progress, handed to the work closure
#[derive(Clone)]
pub struct ProgressReporter {
    tx: watch::Sender<f64>,
}

impl ProgressReporter {
    /// Report completion as a fraction in 0.0..=1.0
    pub fn report(&self, fraction: f64) {
        let _ = self.tx.send(fraction.clamp(0.0, 1.0));
    }
}

/// Handle to a submitted task: progress stream plus completion
pub struct TaskHandle {
    name: String,
    progress: watch::Receiver<f64>,
    join: JoinHandle<Result<()>>,
}

impl TaskHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Watch receiver for progress updates
    pub fn progress(&self) -> watch::Receiver<f64> {
        self.progress.clone()
    }

    /// Most recently reported progress fraction
    pub fn current_progress(&self) -> f64 {
        *self.progress.borrow()
    }

    /// Wait for the task to finish and surface its result
    pub async fn wait(self) -> Result<()> {
        match self.join.await {
            Ok(result) => result,
            Err(e) => Err(AppError::Generic(format!(
                "background task '{}' panicked: {}",
                self.name, e
            ))),
        }
    }
}

/// Submits named background work onto the runtime
#[derive(Clone, Default)]
pub struct TaskQueue {
    active: Arc<AtomicUsize>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks currently running
    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Spawn `work`, wiring it a progress reporter, and return the handle
    pub fn submit<F, Fut>(&self, name: &str, work: F) -> TaskHandle
    where
        F: FnOnce(ProgressReporter) -> Fut,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        tracing::info!("Submitting background task: {}", name);

        let (tx, rx) = watch::channel(0.0);
        let future = work(ProgressReporter { tx });

        let active = Arc::clone(&self.active);
        active.fetch_add(1, Ordering::SeqCst);

        let task_name = name.to_string();
        let join = tokio::spawn(async move {
            let result = future.await;
            match &result {
                Ok(()) => tracing::info!("Background task '{}' finished", task_name),
                Err(e) => tracing::error!("Background task '{}' failed: {}", task_name, e),
            }
            active.fetch_sub(1, Ordering::SeqCst);
            result
        });

        TaskHandle {
            name: name.to_string(),
            progress: rx,
            join,
        }
    }
}
