//! Connection cleanup during graceful shutdown.

use std::future::Future;
use std::pin::Pin;
use tracing::{error, info};

type CleanupTask = Pin<Box<dyn Future<Output = Result<(), String>> + Send>>;

/// Collects named cleanup steps and runs them concurrently.
///
/// ```ignore
/// let mut cleanup = CleanupCoordinator::new();
/// cleanup.add_task("nats", async move { nats.flush().await.map_err(|e| e.to_string()) });
/// cleanup.run().await;
/// ```
#[derive(Default)]
pub struct CleanupCoordinator {
    tasks: Vec<(&'static str, CleanupTask)>,
}

impl CleanupCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_task<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = Result<(), String>> + Send + 'static,
    {
        self.tasks.push((name, Box::pin(task)));
    }

    /// Run every step; a failing step is logged and does not stop the others.
    /// Returns the number of failed steps.
    pub async fn run(self) -> usize {
        info!("Running {} cleanup tasks", self.tasks.len());

        let names: Vec<_> = self.tasks.iter().map(|(name, _)| *name).collect();
        let results =
            futures::future::join_all(self.tasks.into_iter().map(|(_, task)| task)).await;

        let mut failed = 0;
        for (name, result) in names.into_iter().zip(results) {
            match result {
                Ok(()) => info!("Cleanup task '{}' completed", name),
                Err(e) => {
                    failed += 1;
                    error!("Cleanup task '{}' failed: {}", name, e);
                }
            }
        }

        failed
    }
}
