use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;

/// Bearer token issued by the server.
///
/// Decodes both the OAuth client credentials response
/// (`access_token` + relative `expires_in`) and the older basic-auth exchange
/// response (`token` + absolute `expires`). Expiry is always held as an
/// absolute instant.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "TokenResponse")]
pub struct Token {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Token {
    pub fn new(value: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// A token without expiry never goes stale.
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at > now,
            None => true,
        }
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenDecodeError {
    #[error("response has neither `access_token` nor `token`")]
    MissingToken,
    #[error("`access_token` present without `expires_in`")]
    MissingExpiresIn,
    #[error("`token` present without `expires`")]
    MissingExpires,
    #[error("`expires_in` out of range: {0}")]
    ExpiresInOutOfRange(f64),
    #[error("`expires` is not an RFC 3339 timestamp: {0}")]
    BadExpires(#[from] chrono::ParseError),
}

/// Union of both wire shapes; unknown fields such as `scope` are ignored.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    /// Seconds from now.
    expires_in: Option<f64>,
    token: Option<String>,
    /// e.g. `2750-06-22T22:05:58.81Z`
    expires: Option<String>,
}

impl TryFrom<TokenResponse> for Token {
    type Error = TokenDecodeError;

    fn try_from(res: TokenResponse) -> Result<Self, Self::Error> {
        if let Some(access_token) = res.access_token {
            let expires_in = res.expires_in.ok_or(TokenDecodeError::MissingExpiresIn)?;
            let expires_at = relative_expiry(expires_in)?;
            return Ok(Self::new(access_token, Some(expires_at)));
        }

        let token = res.token.ok_or(TokenDecodeError::MissingToken)?;
        let expires = res.expires.ok_or(TokenDecodeError::MissingExpires)?;
        let expires_at = DateTime::parse_from_rfc3339(&expires)?.with_timezone(&Utc);
        Ok(Self::new(token, Some(expires_at)))
    }
}

fn relative_expiry(expires_in: f64) -> Result<DateTime<Utc>, TokenDecodeError> {
    if !expires_in.is_finite() {
        return Err(TokenDecodeError::ExpiresInOutOfRange(expires_in));
    }
    TimeDelta::try_milliseconds((expires_in * 1000.0) as i64)
        .and_then(|delta| Utc::now().checked_add_signed(delta))
        .ok_or(TokenDecodeError::ExpiresInOutOfRange(expires_in))
}
