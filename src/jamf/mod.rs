//! Jamf Pro API client.
//!
//! [`Client`] attaches whichever authorization the server accepts. While the
//! server supports bearer tokens it sends `Authorization: Bearer`, refreshing
//! and retrying once when a token is rejected. Once the token endpoint turns
//! out to be missing it switches to `Authorization: Basic` for good.

use std::sync::Arc;

use bytes::Bytes;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use self::auth::client_credentials::{
    bearer_token_request, oauth_token_request, APPLICATION_JSON, BEARER_TOKEN_ENDPOINT,
    OAUTH_TOKEN_ENDPOINT,
};
use self::auth::{AuthManager, Credentials, Token, TokenProvider};
use self::utils::check_status;
use crate::error::{AuthError, Error, NetworkingError, Result};

pub mod auth;
mod utils;
pub mod version;

const TEXT_XML: &str = "text/xml";

#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    server_url: Url,
    auth: Arc<AuthManager>,
}

impl Client {
    /// Fails with [`NetworkingError::BadServerUrl`] before any network call
    /// when `server_url` is not an absolute http(s) URL.
    pub fn new(http: reqwest::Client, server_url: &str, auth: Arc<AuthManager>) -> Result<Self> {
        let server_url = parse_server_url(server_url)?;
        Ok(Self {
            http,
            server_url,
            auth,
        })
    }

    pub fn auth_manager(&self) -> &Arc<AuthManager> {
        &self.auth
    }

    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    /// Absolute URL of `endpoint` on the configured server.
    pub fn url(&self, endpoint: &str) -> Result<Url> {
        self.server_url
            .join(endpoint)
            .map_err(|_| NetworkingError::BadServerUrl(format!("{}{endpoint}", self.server_url)).into())
    }

    fn build_request(&self, method: Method, endpoint: &str) -> Result<reqwest::RequestBuilder> {
        Ok(self.http.request(method, self.url(endpoint)?))
    }

    /// Performs an authorized request and decodes its JSON body.
    pub async fn load<T: DeserializeOwned>(&self, request: reqwest::Request) -> Result<T> {
        let body = self.send(request).await?;
        Self::parse_json(&body)
    }

    /// Performs an authorized request and returns the raw body.
    pub async fn send(&self, request: reqwest::Request) -> Result<Bytes> {
        if self.auth.strategy().await.uses_bearer() {
            match self.send_bearer_authorized(&request).await {
                Err(Error::Auth(AuthError::BearerAuthNotSupported)) => {
                    info!(message = "Bearer auth not supported, retrying with basic auth", url = %request.url());
                }
                other => return other,
            }
        }
        self.send_basic_authorized(&request).await
    }

    async fn send_bearer_authorized(&self, request: &reqwest::Request) -> Result<Bytes> {
        let token = self.auth.valid_token(self.token_provider()).await?;
        let res = self.exec(authorize_bearer(clone_request(request)?, &token)?).await?;
        if res.status() != StatusCode::UNAUTHORIZED {
            return Self::read_body(res).await;
        }

        warn!(message = "Bearer token rejected, refreshing and retrying once", url = %request.url());
        let token = self.auth.force_refresh(self.token_provider()).await?;
        let res = self.exec(authorize_bearer(clone_request(request)?, &token)?).await?;
        if res.status() == StatusCode::UNAUTHORIZED {
            return Err(AuthError::InvalidToken.into());
        }
        Self::read_body(res).await
    }

    /// Credentials are not going to change, so a 401 here is final.
    async fn send_basic_authorized(&self, request: &reqwest::Request) -> Result<Bytes> {
        let req = self.authorize_basic(clone_request(request)?).await?;
        let res = self.exec(req).await?;
        if res.status() == StatusCode::UNAUTHORIZED {
            return Err(AuthError::InvalidCredentials.into());
        }
        Self::read_body(res).await
    }

    /// Client credentials have no Basic form; they always present the token
    /// from the client credentials grant.
    async fn authorize_basic(&self, mut req: reqwest::Request) -> Result<reqwest::Request> {
        let value = match self.auth.credentials() {
            Credentials::BasicAuth { .. } => format!("Basic {}", self.auth.basic_auth_string()?),
            Credentials::ClientCredentials { .. } => {
                let token = self.auth.valid_token(self.token_provider()).await?;
                format!("Bearer {}", token.value())
            }
        };
        req.headers_mut()
            .insert(AUTHORIZATION, sensitive_header(value, AuthError::InvalidCredentials)?);
        Ok(req)
    }

    fn token_provider(&self) -> Arc<dyn TokenProvider> {
        Arc::new(self.clone())
    }

    async fn exec(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        debug!(message = "Sending request", method = %request.method(), url = %request.url());
        let res = self.http.execute(request).await?;
        debug!(message = "Received response", status = %res.status(), url = %res.url());
        Ok(res)
    }

    async fn read_body(res: reqwest::Response) -> Result<Bytes> {
        check_status(&res)?;
        Ok(res.bytes().await?)
    }

    fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Name of the organization the server is licensed to.
    pub async fn organization_name(&self) -> Result<String> {
        let req = self
            .build_request(Method::GET, "JSSResource/activationcode")?
            .header(ACCEPT, APPLICATION_JSON)
            .build()?;
        let info: model::ActivationCode = self.load(req).await?;
        Ok(info.activation_code.organization_name)
    }

    /// Uploads a computer configuration profile (XML).
    pub async fn upload_computer_profile(&self, profile: impl Into<Bytes>) -> Result<()> {
        let req = self
            .build_request(Method::POST, "JSSResource/osxconfigurationprofiles")?
            .header(CONTENT_TYPE, TEXT_XML)
            .header(ACCEPT, TEXT_XML)
            .body(profile.into())
            .build()?;
        self.send(req).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl TokenProvider for Client {
    async fn get_auth_token(&self) -> Result<Token> {
        let body = match self.auth.credentials() {
            Credentials::BasicAuth { .. } => {
                let req = bearer_token_request(&self.http, self.url(BEARER_TOKEN_ENDPOINT)?)?;
                self.send_basic_authorized(&req).await?
            }
            Credentials::ClientCredentials {
                client_id,
                client_secret,
            } => {
                let url = self.url(OAUTH_TOKEN_ENDPOINT)?;
                let req = oauth_token_request(&self.http, url, client_id, client_secret)?;
                Self::read_body(self.exec(req).await?).await?
            }
        };
        Self::parse_json(&body)
    }
}

fn parse_server_url(server_url: &str) -> Result<Url, NetworkingError> {
    let bad_url = || NetworkingError::BadServerUrl(server_url.to_owned());
    let mut url = Url::parse(server_url.trim()).map_err(|_| bad_url())?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(bad_url());
    }
    // so joined endpoints extend the path instead of replacing its last segment
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn clone_request(request: &reqwest::Request) -> Result<reqwest::Request> {
    request
        .try_clone()
        .ok_or_else(|| Error::RequestNotCloneable(request.url().to_string()))
}

fn authorize_bearer(mut req: reqwest::Request, token: &Token) -> Result<reqwest::Request> {
    let value = sensitive_header(format!("Bearer {}", token.value()), AuthError::InvalidToken)?;
    req.headers_mut().insert(AUTHORIZATION, value);
    Ok(req)
}

fn sensitive_header(value: String, invalid: AuthError) -> Result<HeaderValue, AuthError> {
    let mut value = HeaderValue::try_from(value).map_err(|_| invalid)?;
    value.set_sensitive(true);
    Ok(value)
}

pub mod model {
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    pub struct ActivationCode {
        pub activation_code: OrgAndCode,
    }

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    pub struct OrgAndCode {
        pub organization_name: String,
        pub code: String,
    }
}
