use crate::request::HttpRequest;
use serde_json::json;
use tasklane_core::types::{Credentials, Registration};

pub const REGISTER_PATH: &str = "/api/auth/register";
pub const LOGIN_PATH: &str = "/api/auth/login";
pub const CURRENT_USER_PATH: &str = "/api/auth/me";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub base_url: String,
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

pub fn build_register_request(cfg: &BackendConfig, reg: &Registration) -> HttpRequest {
    HttpRequest::post_json(
        join_url(&cfg.base_url, REGISTER_PATH),
        &json!({
            "username": reg.identifier,
            "email": reg.email,
            "password": reg.secret,
        }),
    )
}

// The backend accepts a username or an email in the `username` field.
pub fn build_login_request(cfg: &BackendConfig, creds: &Credentials) -> HttpRequest {
    HttpRequest::post_json(
        join_url(&cfg.base_url, LOGIN_PATH),
        &json!({
            "username": creds.identifier,
            "password": creds.secret,
        }),
    )
}

pub fn build_current_user_request(cfg: &BackendConfig, token: &str) -> HttpRequest {
    HttpRequest::get(join_url(&cfg.base_url, CURRENT_USER_PATH)).with_bearer(token)
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{}/{}", base, path)
}
