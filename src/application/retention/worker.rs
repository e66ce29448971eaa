use std::sync::Arc;
use tracing::info;

use super::config::RetentionConfig;
use super::scheduler::{PeriodicTaskRunner, TaskError};
use crate::application::errors::QueryError;
use crate::application::use_cases::AuditQueryService;

/// Periodically deletes activity records older than the retention window.
///
/// ```rust,ignore
/// let scheduler = Arc::new(RetentionScheduler::new(query_service, RetentionConfig::default()));
/// tokio::spawn(scheduler.clone().run());
/// ```
pub struct RetentionScheduler {
    queries: Arc<AuditQueryService>,
    config: RetentionConfig,
}

impl RetentionScheduler {
    pub fn new(queries: Arc<AuditQueryService>, config: RetentionConfig) -> Self {
        Self { queries, config }
    }

    pub fn config(&self) -> &RetentionConfig {
        &self.config
    }

    /// Prune once; returns how many records were deleted
    pub async fn run_once(&self) -> Result<u64, QueryError> {
        let deleted = self.queries.clean_old_logs(self.config.days_to_keep).await?;
        if deleted > 0 {
            info!(
                "Retention pass removed {} records (keeping {} days)",
                deleted, self.config.days_to_keep
            );
        }
        Ok(deleted)
    }

    /// Prune on every interval tick until the task is dropped
    pub async fn run(self: Arc<Self>) {
        let interval = self.config.interval;
        let runner = PeriodicTaskRunner::new(self, interval, "activity-log-retention");
        runner
            .run(|scheduler| async move {
                scheduler
                    .run_once()
                    .await
                    .map(|_| ())
                    .map_err(|e| Box::new(e) as TaskError)
            })
            .await;
    }
}
