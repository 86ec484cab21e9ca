use serde::Deserialize;
use std::time::Duration;

use crate::services::generation::{
    PollPolicy, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL_MS,
};

#[derive(Debug, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the journal API server (e.g., "http://localhost:8080").
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Delay between image-generation status checks, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Maximum number of status checks before giving up on a generation job.
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
}

fn default_api_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_max_poll_attempts() -> u32 {
    DEFAULT_MAX_POLL_ATTEMPTS
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Polling policy derived from the configured interval and budget.
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: self.max_poll_attempts,
        }
    }
}
