use std::time::Duration;

/// Configuration for activity log retention
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionConfig {
    /// How often to prune
    pub interval: Duration,
    /// Records older than this many days are deleted
    pub days_to_keep: i64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(86_400), // daily
            days_to_keep: 90,
        }
    }
}

impl RetentionConfig {
    pub fn new(interval: Duration, days_to_keep: i64) -> Self {
        Self {
            interval,
            days_to_keep,
        }
    }
}
