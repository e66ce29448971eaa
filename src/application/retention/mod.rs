//! Scheduled pruning of the activity log

pub mod config;
pub mod scheduler;
pub mod worker;

pub use config::RetentionConfig;
pub use scheduler::{PeriodicTaskRunner, TaskError};
pub use worker::RetentionScheduler;
