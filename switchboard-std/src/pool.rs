//! Bounded pool for fire-and-forget tasks.
//!
//! Background listeners and command handlers run here. Each task holds a
//! permit for its whole lifetime; when no permit is free the submission is
//! dropped and logged. Tasks are wrapped with a timeout and panic capture so
//! a failing handler is reported and isolated from everything else.

use futures::FutureExt;
use std::{any::Any, future::Future, panic::AssertUnwindSafe, sync::Arc, time::Duration};
use switchboard_core::{BoxError, TaskSettings};
use tokio::{sync::Semaphore, time::timeout};

/// A bounded spawner for background handler tasks.
#[derive(Debug, Clone)]
pub struct TaskPool {
    permits: Arc<Semaphore>,
    capacity: usize,
    timeout: Option<Duration>,
}

impl TaskPool {
    /// Create a pool running at most `max_in_flight` tasks at once.
    pub fn new(max_in_flight: usize, timeout: Option<Duration>) -> Self {
        let capacity = max_in_flight.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            timeout,
        }
    }

    /// Create a pool from task settings.
    pub fn from_settings(settings: &TaskSettings) -> Self {
        Self::new(settings.max_in_flight, settings.timeout())
    }

    /// Number of tasks currently running.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.permits.available_permits()
    }

    /// Start `task` in the background. Returns `false` if the pool is full
    /// and the task was dropped. Must be called from within a Tokio runtime.
    pub fn submit<F>(&self, label: impl Into<String>, task: F) -> bool
    where
        F: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let label = label.into();
        let permit = match self.permits.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::warn!(task = %label, capacity = self.capacity, "Task pool saturated, dropping task");
                return false;
            }
        };
        let limit = self.timeout;
        tokio::spawn(async move {
            let _permit = permit;
            supervise(label, task, limit).await;
        });
        true
    }
}

impl Default for TaskPool {
    fn default() -> Self {
        Self::from_settings(&TaskSettings::default())
    }
}

async fn supervise<F>(label: String, task: F, limit: Option<Duration>)
where
    F: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    let guarded = AssertUnwindSafe(task).catch_unwind();
    let outcome = match limit {
        Some(limit) => match timeout(limit, guarded).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(task = %label, timeout = ?limit, "Task timed out");
                return;
            }
        },
        None => guarded.await,
    };

    match outcome {
        Ok(Ok(())) => tracing::trace!(task = %label, "Task finished"),
        Ok(Err(error)) => tracing::warn!(task = %label, %error, "Task failed"),
        Err(payload) => {
            tracing::error!(task = %label, panic = %panic_message(payload.as_ref()), "Task panicked")
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
