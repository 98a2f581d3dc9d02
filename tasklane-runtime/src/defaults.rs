use tasklane_core::config::{CaptureOptions, ClientConfig, DEFAULT_SESSION_TTL_DAYS};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

pub fn default_client_config() -> ClientConfig {
    ClientConfig {
        api_base_url: DEFAULT_API_BASE_URL.into(),
        session_ttl_days: DEFAULT_SESSION_TTL_DAYS,
        capture: CaptureOptions::default(),
        session_path: None,
    }
}
