//! Server version discovery.

use std::fmt;

use reqwest::header::ACCEPT;
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, warn};

use super::auth::client_credentials::APPLICATION_JSON;
use super::Client;
use crate::error::{Error, Result};

/// Marker that servers older than 10.23 put on their login page.
const VERSION_META_TAG: &str = r#"<meta name="version" content=""#;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JamfProVersion {
    /// e.g. `10.42.0-t1661887915`
    pub version: String,
}

impl JamfProVersion {
    /// Leading run of digits and dots, e.g. `10.42.0`.
    pub fn main_version_info(&self) -> &str {
        let end = self
            .version
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(self.version.len());
        &self.version[..end]
    }

    /// Missing or unparsable components count as 0.
    pub fn semantic(&self) -> SemanticVersion {
        let mut parts = self
            .main_version_info()
            .split('.')
            .map(|part| part.parse().unwrap_or(0));
        SemanticVersion {
            major: parts.next().unwrap_or(0),
            minor: parts.next().unwrap_or(0),
            patch: parts.next().unwrap_or(0),
        }
    }

    /// Reads the version from the `<meta name="version">` tag of the login page.
    pub fn from_html(html: &str) -> Result<Self> {
        let start = html
            .find(VERSION_META_TAG)
            .map(|idx| idx + VERSION_META_TAG.len())
            .ok_or(Error::VersionUnavailable)?;
        let rest = &html[start..];
        let end = rest.find(['-', '"']).ok_or(Error::VersionUnavailable)?;

        let parts = rest[..end]
            .split('.')
            .map(|part| part.parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| Error::VersionUnavailable)?;
        match parts.as_slice() {
            [major, minor, patch] => Ok(Self {
                version: format!("{major}.{minor}.{patch}"),
            }),
            _ => Err(Error::VersionUnavailable),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SemanticVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl SemanticVersion {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Client {
    /// Asks `api/v1/jamf-pro-version` first. Servers before 10.23 lack that
    /// endpoint, so any failure other than an auth failure falls back to
    /// scraping the login page.
    pub async fn jamf_pro_version(&self) -> Result<JamfProVersion> {
        let req = self
            .build_request(Method::GET, "api/v1/jamf-pro-version")?
            .header(ACCEPT, APPLICATION_JSON)
            .build()?;

        match self.load::<JamfProVersion>(req).await {
            Ok(version) => Ok(version),
            Err(err) if err.is_auth() => Err(err),
            Err(err) => {
                warn!(message = "Version endpoint failed, reading the login page instead", error = %err);
                self.version_from_login_page().await
            }
        }
    }

    async fn version_from_login_page(&self) -> Result<JamfProVersion> {
        let req = self.build_request(Method::GET, "")?.build()?;
        let res = self.exec(req).await?;
        let html = res.text().await?;
        let version = JamfProVersion::from_html(&html)?;
        debug!(message = "Found version on login page", version = %version.version);
        Ok(version)
    }
}
