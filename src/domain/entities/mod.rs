mod audit_record;
mod destination;
mod hotel;
mod user;

pub use audit_record::{AuditRecord, AuditRecordBuilder, AuditRecordDbData};
pub use destination::Destination;
pub use hotel::Hotel;
pub use user::User;
