//! Authorization logic.

pub mod client_credentials;
pub mod token;
pub mod token_manager;

pub use token::Token;
pub use token_manager::AuthManager;

use crate::error::Result;

/// Exchanges credentials for a fresh token over the wire.
///
/// Implemented by the request layer and handed to [`AuthManager`], which
/// decides when a network exchange is needed.
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    async fn get_auth_token(&self) -> Result<Token>;
}

/// Credentials held in memory for the lifetime of an [`AuthManager`].
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    BasicAuth { username: String, password: String },
    ClientCredentials { client_id: String, client_secret: String },
}

impl Credentials {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::BasicAuth {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn client(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self::ClientCredentials {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BasicAuth { username, .. } => f
                .debug_struct("BasicAuth")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::ClientCredentials { client_id, .. } => f
                .debug_struct("ClientCredentials")
                .field("client_id", client_id)
                .field("client_secret", &"<redacted>")
                .finish(),
        }
    }
}

/// How the next request will be authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStrategy {
    /// `Authorization: Basic` on every call.
    Basic,
    /// Bearer token obtained from `api/v1/auth/token` with Basic auth.
    BearerViaBasicExchange,
    /// Bearer token obtained from `api/oauth/token` with the client credentials grant.
    OAuthClientCredentials,
}

impl AuthStrategy {
    pub fn uses_bearer(self) -> bool {
        !matches!(self, Self::Basic)
    }
}
