mod actor_context;
mod audit_action;
mod csrf_token;
mod snapshot;

pub use actor_context::{is_tunnel_host, Actor, ActorContext, RequestMetadata};
pub use audit_action::AuditAction;
pub use csrf_token::{CsrfTokenValue, TokenMetadata};
pub use snapshot::{ChangeSet, FieldChange, Snapshot};
