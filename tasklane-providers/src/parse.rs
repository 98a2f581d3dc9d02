use crate::error::RemoteError;
use crate::runtime::HttpResponse;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tasklane_core::types::{AccessToken, UserRecord};

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<Detail>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Detail {
    Text(String),
    Validation(Vec<ValidationItem>),
}

#[derive(Debug, Deserialize)]
struct ValidationItem {
    msg: String,
}

/// Pulls the human-readable `detail` out of an error body, if there is one.
pub fn parse_error_detail(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    let text = match parsed.detail? {
        Detail::Text(s) => s,
        Detail::Validation(items) => items
            .into_iter()
            .map(|i| i.msg)
            .collect::<Vec<_>>()
            .join("; "),
    };
    let text = text.trim().to_string();
    (!text.is_empty()).then_some(text)
}

pub fn check_status(resp: &HttpResponse) -> Result<(), RemoteError> {
    if (200..=299).contains(&resp.status) {
        return Ok(());
    }
    Err(RemoteError::from_status(
        resp.status,
        parse_error_detail(&resp.body),
    ))
}

fn decode<T: DeserializeOwned>(body: &[u8], what: &str) -> Result<T, RemoteError> {
    serde_json::from_slice(body).map_err(|e| RemoteError::Decode(format!("{what}: {e}")))
}

pub fn parse_access_token(body: &[u8]) -> Result<AccessToken, RemoteError> {
    let token: AccessToken = decode(body, "decode token JSON")?;
    if token.access_token.trim().is_empty() {
        return Err(RemoteError::Decode("empty access_token".into()));
    }
    Ok(token)
}

pub fn parse_user_record(body: &[u8]) -> Result<UserRecord, RemoteError> {
    decode(body, "decode user JSON")
}
