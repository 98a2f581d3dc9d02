use crate::error::RemoteError;
use crate::request::{Body, HttpRequest};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Shared HTTP client. Holds the connection pool, so build one and reuse it.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: reqwest::Client,
}

impl HttpExecutor {
    pub fn new() -> Result<Self, RemoteError> {
        // Without an explicit timeout a dead backend would hang sign-in forever.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RemoteError::Transport(format!("build http client: {e}")))?;
        Ok(Self { client })
    }

    pub async fn execute(&self, req: &HttpRequest) -> Result<HttpResponse, RemoteError> {
        let mut headers = HeaderMap::new();
        for (k, v) in &req.headers {
            let name = HeaderName::from_bytes(k.as_bytes())
                .map_err(|_| RemoteError::Transport(format!("invalid header name: {k}")))?;
            let value = HeaderValue::from_str(v)
                .map_err(|_| RemoteError::Transport(format!("invalid header value for {k}")))?;
            headers.insert(name, value);
        }

        let builder = match req.method.as_str() {
            "GET" => self.client.get(&req.url),
            "POST" => self.client.post(&req.url),
            other => {
                return Err(RemoteError::Transport(format!(
                    "unsupported method: {other}"
                )));
            }
        }
        .headers(headers);

        let builder = match &req.body {
            Body::Empty => builder,
            Body::Json(s) => builder.body(s.clone()),
        };

        let resp = builder
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .await
            .map_err(|e| RemoteError::Transport(format!("read response body: {e}")))?
            .to_vec();

        Ok(HttpResponse { status, body })
    }
}
