use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} must be a valid {expected}, got `{value}`")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// OpenAI-compatible chat-completions provider.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    /// Base URL up to and including the version segment.
    pub base_url: String,
}

/// Google OAuth client registration.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host to bind to.
    pub host: String,
    /// Server port to bind to.
    pub port: u16,
    /// Log level (e.g., "info", "debug", "trace").
    pub log_level: String,
    pub openai: OpenAiConfig,
    /// `None` disables the sign-in routes.
    pub google: Option<GoogleConfig>,
    /// HS256 secret for session tokens.
    pub session_secret: String,
    pub session_ttl_secs: i64,
    /// Where the OAuth callback sends the browser once signed in.
    pub post_login_redirect: String,
}

fn parsed<T: std::str::FromStr>(
    name: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.parse().map_err(|_| ConfigError::Invalid {
            name,
            expected,
            value,
        }),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let google = match (
            env::var("GOOGLE_CLIENT_ID"),
            env::var("GOOGLE_CLIENT_SECRET"),
            env::var("GOOGLE_REDIRECT_URI"),
        ) {
            (Ok(client_id), Ok(client_secret), Ok(redirect_uri)) => Some(GoogleConfig {
                client_id,
                client_secret,
                redirect_uri,
            }),
            _ => None,
        };

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parsed("PORT", 3030, "port number")?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            openai: OpenAiConfig {
                api_key: env::var("OPENAI_API_KEY")
                    .map_err(|_| ConfigError::Missing("OPENAI_API_KEY"))?,
                model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
                base_url: env::var("OPENAI_BASE_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            },
            google,
            session_secret: env::var("SESSION_SECRET")
                .unwrap_or_else(|_| "dev-secret-change-me-in-production".to_string()),
            session_ttl_secs: parsed("SESSION_TTL_SECS", 86_400, "number of seconds")?,
            post_login_redirect: env::var("POST_LOGIN_REDIRECT")
                .unwrap_or_else(|_| "/dashboard".to_string()),
        })
    }

    /// Build the socket address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
impl AppConfig {
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            log_level: "debug".to_string(),
            openai: OpenAiConfig {
                api_key: "sk-test".to_string(),
                model: "gpt-4o-mini".to_string(),
                base_url: "http://127.0.0.1:9/v1".to_string(),
            },
            google: Some(GoogleConfig {
                client_id: "client-123".to_string(),
                client_secret: "shh".to_string(),
                redirect_uri: "http://localhost:3030/api/auth/google/callback".to_string(),
            }),
            session_secret: "test-secret".to_string(),
            session_ttl_secs: 3600,
            post_login_redirect: "/dashboard".to_string(),
        }
    }
}
