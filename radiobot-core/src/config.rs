use std::time::Duration;

use crate::Volume;

/// Tunables for the radio core
#[derive(Debug, Clone)]
pub struct Config {
    /// How often the reconciliation loop looks for radios without a session
    pub tick_interval: Duration,
    /// The volume a freshly started session plays at
    pub default_volume: Volume,
    /// How many times a store operation is attempted when the database is busy
    pub store_retry_attempts: u32,
    /// The delay before the first store retry, doubled for every following one
    pub store_retry_backoff: Duration,
    /// How often a transport that is not ready yet is polled
    pub ready_poll_interval: Duration,
}

impl Config {
    /// Returns how long to wait before the given retry attempt, starting at 0
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.store_retry_backoff
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(10),
            default_volume: Volume::default(),
            store_retry_attempts: 5,
            store_retry_backoff: Duration::from_millis(50),
            ready_poll_interval: Duration::from_secs(1),
        }
    }
}
