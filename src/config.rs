use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;

use crate::jamf::auth::Credentials;

/// Verify a Jamf Pro connection and optionally upload a configuration profile
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Jamf Pro server URL, e.g. https://example.jamfcloud.com
    #[arg(short = 'u', long, env = "JAMF_URL")]
    pub url: String,

    /// Username for basic auth and the bearer token exchange
    #[arg(long, env = "JAMF_USERNAME")]
    pub username: Option<String>,

    #[arg(long, env = "JAMF_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// API client id; takes precedence over username/password
    #[arg(long, env = "JAMF_CLIENT_ID")]
    pub client_id: Option<String>,

    #[arg(long, env = "JAMF_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Per-request timeout in seconds
    #[arg(short, long, env = "JAMF_TIMEOUT", default_value = "45")]
    pub timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Configuration profile (XML) to upload after verifying the connection
    #[arg(short, long)]
    pub profile: Option<PathBuf>,
}

/// No `Debug`: it would print the secrets.
#[derive(Clone)]
pub struct Config {
    pub server_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub request_timeout: Duration,
    pub log_level: String,
    pub profile: Option<PathBuf>,
}

impl Config {
    /// Load configuration with priority: CLI > ENV (including `.env`) > defaults
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Ok(Self::from(CliArgs::parse()))
    }

    /// Client credentials win when both halves are present.
    pub fn credentials(&self) -> Result<Credentials> {
        match (
            &self.client_id,
            &self.client_secret,
            &self.username,
            &self.password,
        ) {
            (Some(id), Some(secret), _, _) => Ok(Credentials::client(id, secret)),
            (_, _, Some(username), Some(password)) => Ok(Credentials::basic(username, password)),
            _ => bail!(
                "credentials are required: set JAMF_CLIENT_ID and JAMF_CLIENT_SECRET, \
                 or JAMF_USERNAME and JAMF_PASSWORD"
            ),
        }
    }
}

impl From<CliArgs> for Config {
    fn from(args: CliArgs) -> Self {
        Self {
            server_url: args.url,
            username: args.username,
            password: args.password,
            client_id: args.client_id,
            client_secret: args.client_secret,
            request_timeout: Duration::from_secs(args.timeout),
            log_level: args.log_level,
            profile: args.profile,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            server_url: "https://example.jamfcloud.com".into(),
            username: None,
            password: None,
            client_id: None,
            client_secret: None,
            request_timeout: Duration::from_secs(45),
            log_level: "info".into(),
            profile: None,
        }
    }

    #[test]
    fn cli_args_map_onto_config() {
        let args = CliArgs::try_parse_from([
            "jamf-pro-api",
            "--url",
            "https://example.jamfcloud.com",
            "--username",
            "admin",
            "--password",
            "secret",
            "--timeout",
            "10",
            "--profile",
            "profile.xml",
        ])
        .unwrap();
        let config = Config::from(args);

        assert_eq!(config.server_url, "https://example.jamfcloud.com");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.profile, Some(PathBuf::from("profile.xml")));
    }

    #[test]
    fn username_and_password_give_basic_credentials() {
        let config = Config {
            username: Some("admin".into()),
            password: Some("secret".into()),
            ..config()
        };
        assert_eq!(config.credentials().unwrap(), Credentials::basic("admin", "secret"));
    }

    #[test]
    fn client_credentials_take_precedence() {
        let config = Config {
            username: Some("admin".into()),
            password: Some("secret".into()),
            client_id: Some("id".into()),
            client_secret: Some("shh".into()),
            ..config()
        };
        assert_eq!(config.credentials().unwrap(), Credentials::client("id", "shh"));
    }

    #[test]
    fn half_of_a_client_pair_falls_back_to_username() {
        let config = Config {
            username: Some("admin".into()),
            password: Some("secret".into()),
            client_id: Some("id".into()),
            ..config()
        };
        assert_eq!(config.credentials().unwrap(), Credentials::basic("admin", "secret"));
    }

    #[test]
    fn missing_credentials_is_an_error() {
        let config = Config {
            username: Some("admin".into()),
            ..config()
        };
        assert!(config.credentials().is_err());
    }
}
