//! Detached work that outlives the request that scheduled it.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinSet;

/// Scheduler for fire-and-forget tasks such as cache writes.
///
/// `spawn` returns immediately. Tasks keep running after the caller's
/// response is sent; `drain` gives them a bounded window to finish at
/// shutdown.
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Detach `task`. Nothing about its outcome reaches the caller.
    pub fn spawn<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        // Reap finished tasks so the set does not grow without bound.
        while tasks.try_join_next().is_some() {}
        tasks.spawn(task);
        tracing::trace!(task = name, pending = tasks.len(), "Background task scheduled");
    }

    /// Tasks not yet reaped.
    pub fn pending(&self) -> usize {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Wait up to `deadline` for outstanding tasks, then abort the rest.
    /// Returns the number of tasks aborted.
    pub async fn drain(&self, deadline: Duration) -> usize {
        let mut tasks = {
            let mut guard = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *guard)
        };

        let finished = tokio::time::timeout(deadline, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;

        if finished.is_ok() {
            return 0;
        }
        let aborted = tasks.len();
        tasks.abort_all();
        tracing::warn!(aborted, "Background tasks dropped at drain deadline");
        aborted
    }
}
