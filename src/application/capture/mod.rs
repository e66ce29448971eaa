//! Audit capture
//!
//! Capture paths turn lifecycle and security notifications into audit
//! records. They never return an error to the notifier: the result is a
//! [`CaptureOutcome`], and failures are logged here at the boundary.

mod entity_changes;
mod manual;
mod security_events;

pub use entity_changes::{EntityChangeCapture, EntityChangeScopes};
pub use manual::ManualAuditHelper;
pub use security_events::{LogoutDetection, SecurityEventCapture};

use tracing::{debug, error};

use crate::application::errors::AuditFailure;
use crate::application::ports::AuditRecordRepository;
use crate::domain::entities::AuditRecord;

/// Result of one capture call
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    /// Record persisted (with its assigned id)
    Recorded(Box<AuditRecord>),
    /// Nothing to record (untracked kind, no identity, duplicate logout)
    Skipped,
    /// Record could not be persisted; the triggering operation is unaffected
    Failed(AuditFailure),
}

impl CaptureOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, CaptureOutcome::Recorded(_))
    }

    pub fn record(&self) -> Option<&AuditRecord> {
        match self {
            CaptureOutcome::Recorded(record) => Some(record.as_ref()),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&AuditFailure> {
        match self {
            CaptureOutcome::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Persist one record in its own write, logging any failure
pub(crate) async fn persist(
    repository: &dyn AuditRecordRepository,
    record: AuditRecord,
) -> CaptureOutcome {
    let action = record.action().clone();
    let entity_type = record.entity_type().to_string();
    match repository.store(record).await {
        Ok(stored) => {
            debug!(
                action = %action,
                entity_type = %entity_type,
                id = ?stored.id(),
                "Activity recorded"
            );
            CaptureOutcome::Recorded(Box::new(stored))
        }
        Err(e) => {
            let failure = AuditFailure::from(e);
            error!(
                "Failed to record {} activity for {}: {}",
                action, entity_type, failure
            );
            CaptureOutcome::Failed(failure)
        }
    }
}
