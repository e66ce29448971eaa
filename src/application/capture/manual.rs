use std::sync::Arc;

use super::{persist, CaptureOutcome};
use crate::application::errors::AuditFailure;
use crate::application::ports::AuditRecordRepository;
use crate::domain::entities::AuditRecord;
use crate::domain::value_objects::{ActorContext, AuditAction};

/// Explicit logging for controllers, for actions the lifecycle hooks do not
/// see (page views, exports, admin tooling).
pub struct ManualAuditHelper {
    repository: Arc<dyn AuditRecordRepository>,
}

impl ManualAuditHelper {
    pub fn new(repository: Arc<dyn AuditRecordRepository>) -> Self {
        Self { repository }
    }

    /// Build and persist one record from the acting context.
    ///
    /// The failure is already logged; callers normally just discard it.
    pub async fn log_activity(
        &self,
        action: AuditAction,
        entity_type: &str,
        entity_id: Option<i64>,
        entity_name: Option<&str>,
        description: &str,
        ctx: &ActorContext,
    ) -> Result<(), AuditFailure> {
        let record = AuditRecord::builder(action, entity_type)
            .entity_id(entity_id)
            .entity_name(entity_name.map(str::to_string))
            .description(description)
            .context(ctx)
            .build();
        match persist(self.repository.as_ref(), record).await {
            CaptureOutcome::Failed(failure) => Err(failure),
            _ => Ok(()),
        }
    }
}
