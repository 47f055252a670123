use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{AuthStrategy, Credentials, Token, TokenProvider};
use crate::error::{AuthError, Error, Result};

type PendingRefresh = Shared<BoxFuture<'static, Result<Token>>>;

/// Holds the current token and makes sure at most one token exchange is in
/// flight at a time; every caller arriving during a refresh gets that
/// refresh's result.
///
/// Also remembers whether the server supports bearer tokens at all. The first
/// 404 from the token endpoint switches this off for the rest of the
/// manager's life.
pub struct AuthManager {
    credentials: Credentials,
    state: Arc<Mutex<State>>,
}

struct State {
    current_token: Option<Token>,
    refresh: Option<PendingRefresh>,
    bearer_supported: bool,
}

impl AuthManager {
    pub fn new(credentials: Credentials) -> Self {
        let state = State {
            current_token: None,
            refresh: None,
            bearer_supported: true,
        };
        Self {
            credentials,
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Returns the cached token while it is valid, otherwise joins or starts a refresh.
    pub async fn valid_token(&self, provider: Arc<dyn TokenProvider>) -> Result<Token> {
        let refresh = {
            let mut state = self.state.lock().await;

            if let Some(refresh) = state.refresh.clone() {
                debug!(message = "Joining in-flight token refresh");
                refresh
            } else if let Some(token) = state.current_token.clone().filter(Token::is_valid) {
                debug!(message = "Using preexisting token", token_expires_at = ?token.expires_at());
                return Ok(token);
            } else {
                info!(
                    message = "No valid token, about to get a new one",
                    token_is_stale = state.current_token.is_some(),
                );
                self.start_refresh(&mut state, provider)
            }
        };

        refresh.await
    }

    /// Joins or starts a refresh regardless of the cached token.
    pub async fn force_refresh(&self, provider: Arc<dyn TokenProvider>) -> Result<Token> {
        let refresh = {
            let mut state = self.state.lock().await;
            match state.refresh.clone() {
                Some(refresh) => {
                    debug!(message = "Joining in-flight token refresh");
                    refresh
                }
                None => {
                    info!(message = "Forcing token refresh");
                    self.start_refresh(&mut state, provider)
                }
            }
        };

        refresh.await
    }

    /// True until the server has answered a token exchange with 404.
    pub async fn bearer_supported(&self) -> bool {
        self.state.lock().await.bearer_supported
    }

    pub async fn strategy(&self) -> AuthStrategy {
        if !self.bearer_supported().await {
            return AuthStrategy::Basic;
        }
        match self.credentials {
            Credentials::BasicAuth { .. } => AuthStrategy::BearerViaBasicExchange,
            Credentials::ClientCredentials { .. } => AuthStrategy::OAuthClientCredentials,
        }
    }

    /// Base64 of `username:password` for an `Authorization: Basic` header.
    ///
    /// Reads only the immutable credentials, so it takes no lock.
    pub fn basic_auth_string(&self) -> Result<String, AuthError> {
        match &self.credentials {
            Credentials::BasicAuth { username, password }
                if !username.is_empty() && !password.is_empty() =>
            {
                Ok(BASE64.encode(format!("{username}:{password}")))
            }
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    /// Must be called with the state lock held. The exchange runs on its own
    /// task so that callers giving up on their wait do not cancel it; the task
    /// stores the outcome and empties the pending slot under the same lock
    /// before the shared result resolves.
    fn start_refresh(&self, state: &mut State, provider: Arc<dyn TokenProvider>) -> PendingRefresh {
        let shared_state = Arc::clone(&self.state);

        let handle = tokio::spawn(async move {
            let result = AssertUnwindSafe(provider.get_auth_token())
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(Error::RefreshTask("token provider panicked".into())));

            let mut state = shared_state.lock().await;
            state.refresh = None;

            match result {
                Ok(token) => {
                    debug!(message = "Got new token", token_expires_at = ?token.expires_at());
                    state.current_token = Some(token.clone());
                    Ok(token)
                }
                Err(err) => Err(classify_failure(&mut state, err)),
            }
        });

        let refresh = async move {
            match handle.await {
                Ok(result) => result,
                Err(err) => Err(Error::RefreshTask(err.to_string())),
            }
        }
        .boxed()
        .shared();

        state.refresh = Some(refresh.clone());
        refresh
    }
}

fn classify_failure(state: &mut State, err: Error) -> Error {
    match err.status_code() {
        Some(404) => {
            warn!(message = "Token endpoint not found, falling back to basic auth for this server");
            state.bearer_supported = false;
            AuthError::BearerAuthNotSupported.into()
        }
        Some(401) => {
            warn!(message = "Token exchange rejected the credentials");
            AuthError::InvalidCredentials.into()
        }
        _ => {
            warn!(message = "Token refresh failed", error = %err);
            err
        }
    }
}
