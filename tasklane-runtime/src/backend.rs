use tasklane_core::types::{AccessToken, Credentials, Registration, UserRecord};
use tasklane_engine::traits::AuthBackend;
use tasklane_providers::RemoteError;
use tasklane_providers::backend::{
    BackendConfig, build_current_user_request, build_login_request, build_register_request,
};
use tasklane_providers::parse::{check_status, parse_access_token, parse_user_record};
use tasklane_providers::request::HttpRequest;
use tasklane_providers::runtime::{HttpExecutor, HttpResponse};

/// `AuthBackend` over the task backend's HTTP auth endpoints.
#[derive(Debug, Clone)]
pub struct HttpAuthBackend {
    cfg: BackendConfig,
    http: HttpExecutor,
}

impl HttpAuthBackend {
    pub fn new(base_url: impl Into<String>) -> Result<Self, RemoteError> {
        Ok(Self {
            cfg: BackendConfig::new(base_url),
            http: HttpExecutor::new()?,
        })
    }

    /// Like [`send`](Self::send), for endpoints where "already exists" is
    /// meaningless: a 400 there is an ordinary failure.
    async fn send_plain(&self, req: &HttpRequest) -> Result<HttpResponse, RemoteError> {
        self.send(req).await.map_err(|e| match e {
            RemoteError::Conflict { status, message } => RemoteError::Status { status, message },
            other => other,
        })
    }

    async fn send(&self, req: &HttpRequest) -> Result<HttpResponse, RemoteError> {
        log::debug!("{} {}", req.method, req.url);
        let resp = self.http.execute(req).await?;
        check_status(&resp)?;
        Ok(resp)
    }
}

#[async_trait::async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn register(&self, registration: &Registration) -> Result<UserRecord, RemoteError> {
        let resp = self
            .send(&build_register_request(&self.cfg, registration))
            .await?;
        parse_user_record(&resp.body)
    }

    async fn login(&self, credentials: &Credentials) -> Result<AccessToken, RemoteError> {
        let resp = self
            .send_plain(&build_login_request(&self.cfg, credentials))
            .await?;
        parse_access_token(&resp.body)
    }

    async fn current_user(&self, token: &str) -> Result<UserRecord, RemoteError> {
        let resp = self
            .send_plain(&build_current_user_request(&self.cfg, token))
            .await?;
        parse_user_record(&resp.body)
    }
}
