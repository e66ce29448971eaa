pub mod auth;
pub mod cors;
pub mod request_context;
pub mod validation;

pub use auth::{auth_middleware, CurrentIdentity};
pub use request_context::{request_context_middleware, RequestContext};
