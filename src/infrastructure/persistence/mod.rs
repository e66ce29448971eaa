mod in_memory_audit_repository;
mod postgres_audit_repository;

pub use in_memory_audit_repository::InMemoryAuditRecordRepository;
pub use postgres_audit_repository::PostgresAuditRecordRepository;
