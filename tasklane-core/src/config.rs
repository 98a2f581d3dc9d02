use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_SESSION_TTL_DAYS: u32 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureOptions {
    pub lang: String,
    pub continuous: bool,
    pub interim_results: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            lang: "en-US".into(),
            continuous: false,
            interim_results: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api_base_url: String,

    // Advisory only; the backend decides when a token actually stops working.
    #[serde(default = "default_ttl_days")]
    pub session_ttl_days: u32,

    #[serde(default)]
    pub capture: CaptureOptions,

    // None means "next to the config file".
    #[serde(default)]
    pub session_path: Option<PathBuf>,
}

fn default_ttl_days() -> u32 {
    DEFAULT_SESSION_TTL_DAYS
}

impl ClientConfig {
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.session_ttl_days))
    }
}
