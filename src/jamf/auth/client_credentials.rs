//! Requests that exchange credentials for a bearer token.

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use url::Url;

use crate::error::Result;

/// OAuth client credentials grant, Jamf Pro 10.49+.
pub const OAUTH_TOKEN_ENDPOINT: &str = "api/oauth/token";
/// Basic-auth exchange for a bearer token, Jamf Pro 10.34+.
pub const BEARER_TOKEN_ENDPOINT: &str = "api/v1/auth/token";

pub(crate) const APPLICATION_JSON: &str = "application/json";
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Form body for the client credentials grant.
///
/// Values are percent-encoded with space as `%20`.
pub fn form_body(client_id: &str, client_secret: &str) -> String {
    let params = [
        ("grant_type", "client_credentials"),
        ("client_id", client_id),
        ("client_secret", client_secret),
    ];
    params
        .iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// `POST <base>/api/oauth/token`; needs no `Authorization` header.
pub fn oauth_token_request(
    client: &reqwest::Client,
    url: Url,
    client_id: &str,
    client_secret: &str,
) -> Result<reqwest::Request> {
    let req = client
        .request(Method::POST, url)
        .header(ACCEPT, APPLICATION_JSON)
        .header(CONTENT_TYPE, FORM_URLENCODED)
        .body(form_body(client_id, client_secret))
        .build()?;
    Ok(req)
}

/// `POST <base>/api/v1/auth/token`; the caller adds the Basic `Authorization` header.
pub fn bearer_token_request(client: &reqwest::Client, url: Url) -> Result<reqwest::Request> {
    let req = client
        .request(Method::POST, url)
        .header(ACCEPT, APPLICATION_JSON)
        .build()?;
    Ok(req)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_body_percent_encodes_values() {
        assert_eq!(
            form_body("mine&yours", "foo bar"),
            "grant_type=client_credentials&client_id=mine%26yours&client_secret=foo%20bar"
        );
    }

    #[test]
    fn oauth_request_shape() {
        let client = reqwest::Client::new();
        let url = Url::parse("https://something/api/oauth/token").unwrap();
        let req = oauth_token_request(&client, url, "mine&yours", "foo bar").unwrap();

        assert_eq!(req.method(), Method::POST);
        assert_eq!(req.url().as_str(), "https://something/api/oauth/token");
        assert_eq!(req.headers()[ACCEPT], APPLICATION_JSON);
        assert_eq!(req.headers()[CONTENT_TYPE], FORM_URLENCODED);
        assert!(req.headers().get(reqwest::header::AUTHORIZATION).is_none());

        let body = req.body().and_then(|body| body.as_bytes()).unwrap();
        assert_eq!(
            std::str::from_utf8(body).unwrap(),
            "grant_type=client_credentials&client_id=mine%26yours&client_secret=foo%20bar"
        );
    }

    #[test]
    fn bearer_request_shape() {
        let client = reqwest::Client::new();
        let url = Url::parse("https://something/api/v1/auth/token").unwrap();
        let req = bearer_token_request(&client, url).unwrap();

        assert_eq!(req.method(), Method::POST);
        assert_eq!(req.headers()[ACCEPT], APPLICATION_JSON);
        assert!(req.body().is_none());
    }
}
