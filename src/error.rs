//! Error taxonomy shared by the auth manager and the request executor.

use std::sync::Arc;

/// Authentication failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Username/password or client id/secret are empty, or the server rejected them.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// The bearer token was rejected again after one forced refresh.
    #[error("bearer token rejected by the server")]
    InvalidToken,
    /// The server has no bearer token endpoint (Jamf Pro older than 10.34).
    #[error("server does not support bearer authentication")]
    BearerAuthNotSupported,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkingError {
    #[error("bad server url: {0}")]
    BadServerUrl(String),
    #[error("{status_code} status code from {url}")]
    ServerResponse { status_code: u16, url: String },
}

impl NetworkingError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ServerResponse { status_code, .. } => Some(*status_code),
            Self::BadServerUrl(_) => None,
        }
    }
}

/// Crate-level error.
///
/// Cloneable so the result of one shared token refresh can be handed to every
/// caller that joined it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("auth: {0}")]
    Auth(#[from] AuthError),
    #[error("networking: {0}")]
    Networking(#[from] NetworkingError),
    #[error("reqwest: {0}")]
    Reqwest(#[source] Arc<reqwest::Error>),
    #[error("decode: {0}")]
    Decode(#[source] Arc<serde_json::Error>),
    #[error("request body for {0} cannot be cloned for a retry")]
    RequestNotCloneable(String),
    #[error("server version unavailable")]
    VersionUnavailable,
    #[error("token refresh task failed: {0}")]
    RefreshTask(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Reqwest(Arc::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(Arc::new(err))
    }
}

impl Error {
    /// The HTTP status carried by a server-response error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Networking(err) => err.status_code(),
            _ => None,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
