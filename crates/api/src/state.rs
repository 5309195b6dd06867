use std::sync::Arc;

use bizsite_core::content::{ContentAgent, LanguageModel};

use crate::config::AppConfig;
use crate::google::GoogleOAuth;
use crate::session::SessionKeys;

/// Shared application state, passed to all handlers via Axum's `State` extractor.
/// Wrapped in `Arc` so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    config: AppConfig,
    agent: ContentAgent,
    google: Option<GoogleOAuth>,
    sessions: SessionKeys,
}

impl AppState {
    pub fn new(config: AppConfig, model: Arc<dyn LanguageModel>) -> Self {
        let google = config.google.clone().map(GoogleOAuth::new);
        let sessions = SessionKeys::new(&config.session_secret, config.session_ttl_secs);
        Self {
            inner: Arc::new(InnerState {
                agent: ContentAgent::new(model),
                google,
                sessions,
                config,
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn agent(&self) -> &ContentAgent {
        &self.inner.agent
    }

    pub fn google(&self) -> Option<&GoogleOAuth> {
        self.inner.google.as_ref()
    }

    pub fn sessions(&self) -> &SessionKeys {
        &self.inner.sessions
    }
}
