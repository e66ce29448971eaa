use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info};

pub type TaskError = Box<dyn std::error::Error + Send + Sync>;

/// Runner for periodic tasks with error handling and logging
pub struct PeriodicTaskRunner<T> {
    task: Arc<T>,
    interval: Duration,
    task_name: String,
}

impl<T> PeriodicTaskRunner<T>
where
    T: Send + Sync + 'static,
{
    pub fn new(task: Arc<T>, interval: Duration, task_name: impl Into<String>) -> Self {
        Self {
            task,
            interval,
            task_name: task_name.into(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run the periodic task forever; a failed run is logged and the loop continues
    pub async fn run<F, Fut>(&self, task_fn: F)
    where
        F: Fn(Arc<T>) -> Fut,
        Fut: std::future::Future<Output = Result<(), TaskError>>,
    {
        info!(
            "Starting periodic task: {} with interval: {:?}",
            self.task_name, self.interval
        );

        let mut interval_timer = time::interval(self.interval);
        interval_timer.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            interval_timer.tick().await;

            if let Err(e) = task_fn(Arc::clone(&self.task)).await {
                error!("Periodic task {} failed: {}", self.task_name, e);
            }
        }
    }

    /// Run the task once (for testing)
    pub async fn run_once<F, Fut>(&self, task_fn: F) -> Result<(), TaskError>
    where
        F: Fn(Arc<T>) -> Fut,
        Fut: std::future::Future<Output = Result<(), TaskError>>,
    {
        task_fn(Arc::clone(&self.task)).await
    }
}
