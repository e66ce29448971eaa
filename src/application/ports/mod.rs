mod audit_repository;
mod session_store;

pub use audit_repository::{
    ActivityStat, AuditQueryFilter, AuditRecordRepository, AuditRepositoryError,
};
pub use session_store::{SessionError, SessionStore};

#[cfg(test)]
pub use audit_repository::MockAuditRecordRepository;
#[cfg(test)]
pub use session_store::MockSessionStore;
