//! Connection verification and profile upload.

use bytes::Bytes;
use tracing::{error, info};

use crate::error::Error;
use crate::jamf::version::SemanticVersion;
use crate::jamf::Client;

/// Servers older than this only accept signed profiles.
pub const UNSIGNED_PROFILES_SINCE: SemanticVersion = SemanticVersion::new(10, 7, 1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationInfo {
    pub must_sign: bool,
    pub organization: String,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum VerificationError {
    #[error("Invalid credentials.")]
    InvalidCredentials(#[source] Error),
    #[error("Jamf Pro server is unavailable.")]
    ServerUnavailable(#[source] Error),
}

impl From<Error> for VerificationError {
    fn from(err: Error) -> Self {
        if err.is_auth() {
            Self::InvalidCredentials(err)
        } else {
            Self::ServerUnavailable(err)
        }
    }
}

pub async fn verify_connection(client: &Client) -> Result<VerificationInfo, VerificationError> {
    info!(message = "Checking connection to Jamf Pro server", url = %client.server_url());

    let result = async {
        let version = client.jamf_pro_version().await?;
        let must_sign = version.semantic() < UNSIGNED_PROFILES_SINCE;
        let organization = client.organization_name().await?;
        Ok::<_, Error>(VerificationInfo {
            must_sign,
            organization,
        })
    }
    .await;

    match result {
        Ok(info) => {
            info!(message = "Connection verified", organization = %info.organization, must_sign = info.must_sign);
            Ok(info)
        }
        Err(err) => {
            let err = VerificationError::from(err);
            error!(message = "Connection check failed", error = %err, cause = ?std::error::Error::source(&err));
            Err(err)
        }
    }
}

pub async fn upload_profile(client: &Client, profile: impl Into<Bytes>) -> Result<(), Error> {
    match client.upload_computer_profile(profile).await {
        Ok(()) => {
            info!(message = "Uploaded profile");
            Ok(())
        }
        Err(err) => {
            error!(message = "Error uploading profile", error = %err);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::error::AuthError;
    use crate::jamf::auth::{AuthManager, Credentials};

    async fn server(version: &str, token_status: u16) -> MockServer {
        let server = MockServer::start().await;
        let token = if token_status == 200 {
            ResponseTemplate::new(200)
                .set_body_json(json!({"token": "abc", "expires": "2750-06-22T22:05:58.81Z"}))
        } else {
            ResponseTemplate::new(token_status)
        };
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/token"))
            .respond_with(token)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/jamf-pro-version"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "version": version })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/JSSResource/activationcode"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "activation_code": {"organization_name": "Acme", "code": "ABCD-1234"}
            })))
            .mount(&server)
            .await;
        server
    }

    fn client(server: &MockServer) -> Client {
        let auth = Arc::new(AuthManager::new(Credentials::basic("test", "none")));
        Client::new(reqwest::Client::new(), &server.uri(), auth).unwrap()
    }

    #[tokio::test]
    async fn recent_server_does_not_need_signing() {
        let server = server("10.42.0-t1661887915", 200).await;
        let info = verify_connection(&client(&server)).await.unwrap();
        assert_eq!(
            info,
            VerificationInfo {
                must_sign: false,
                organization: "Acme".into(),
            }
        );
    }

    #[tokio::test]
    async fn old_server_needs_signing() {
        let server = server("10.7.0-t1538493592", 200).await;
        let info = verify_connection(&client(&server)).await.unwrap();
        assert!(info.must_sign);
    }

    #[tokio::test]
    async fn rejected_credentials() {
        let server = server("10.42.0", 401).await;
        let err = verify_connection(&client(&server)).await.unwrap_err();
        assert!(matches!(
            err,
            VerificationError::InvalidCredentials(Error::Auth(AuthError::InvalidCredentials))
        ));
        assert_eq!(err.to_string(), "Invalid credentials.");
    }

    #[tokio::test]
    async fn unreachable_server() {
        let server = MockServer::start().await;
        let client = client(&server);
        drop(server);

        let err = verify_connection(&client).await.unwrap_err();
        assert!(matches!(err, VerificationError::ServerUnavailable(_)));
        assert_eq!(err.to_string(), "Jamf Pro server is unavailable.");
    }

    #[tokio::test]
    async fn upload_reports_server_errors() {
        let server = server("10.42.0", 200).await;
        Mock::given(method("POST"))
            .and(path("/JSSResource/osxconfigurationprofiles"))
            .respond_with(ResponseTemplate::new(409))
            .expect(1)
            .mount(&server)
            .await;

        let err = upload_profile(&client(&server), "<os_x_configuration_profile/>")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(409));
    }
}
