pub mod activity_logs;
pub mod csrf;
pub mod health;
pub mod session;

pub use activity_logs::{
    activity_stats_handler, clean_activity_logs_handler, entity_activity_handler,
    list_activity_logs_handler, show_activity_log_handler, CLEAN_LOGS_TOKEN_ID,
};
pub use csrf::{
    cleanup_tokens_handler, debug_token_handler, refresh_token_handler, validate_token_handler,
};
pub use health::{health_handler, readiness_handler};
pub use session::logout_handler;
