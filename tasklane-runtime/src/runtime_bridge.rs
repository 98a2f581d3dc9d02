use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tasklane_core::config::ClientConfig;
use tasklane_engine::identity::IdentityBridge;
use tasklane_engine::traits::{AuthBackend, SessionStore};

use crate::backend::HttpAuthBackend;
use crate::session_store::FileSessionStore;

/// Build an identity bridge from config, persisting the session at `session_path`.
pub fn build_bridge_from_config(
    cfg: &ClientConfig,
    session_path: PathBuf,
) -> anyhow::Result<IdentityBridge> {
    let backend: Arc<dyn AuthBackend> = Arc::new(
        HttpAuthBackend::new(cfg.api_base_url.clone()).context("build backend client")?,
    );
    log::debug!("session file: {}", session_path.display());
    let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::at_path(session_path));

    Ok(IdentityBridge::new(backend, store).with_session_ttl(cfg.session_ttl()))
}
