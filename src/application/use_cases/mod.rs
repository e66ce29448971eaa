mod audit_query;
mod csrf_tokens;

pub use audit_query::{AuditQueryService, MAX_LIMIT};
pub use csrf_tokens::{
    is_reserved_token_id, ActiveToken, CsrfTokenLedger, TokenScope, DEFAULT_TOKEN_LIFETIME_SECS,
    METADATA_PREFIX, TOKEN_PREFIX,
};
