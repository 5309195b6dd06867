use thiserror::Error;

/// A non-2xx response from the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("HTTP {status} {status_text}: {body}")]
pub struct HttpError {
    pub status: u16,
    pub status_text: String,
    /// Raw response body text.
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid JSON response: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("a request is already in flight")]
    Busy,

    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http(e) => Some(e.status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Network(e.to_string())
        }
    }
}
