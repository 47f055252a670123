use std::sync::Arc;

use anyhow::Context;
use jamf_pro_api::{
    config::Config,
    core,
    jamf::{auth::AuthManager, Client},
};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.to_lowercase()));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let reqwest_client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .context("failed to build HTTP client")?;

    let auth_manager = Arc::new(AuthManager::new(config.credentials()?));
    let client = Client::new(reqwest_client, &config.server_url, auth_manager)?;

    let info = core::verify_connection(&client).await?;
    info!(
        "Connected to {} (profiles must be signed: {})",
        info.organization, info.must_sign
    );

    if let Some(path) = &config.profile {
        let profile = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read profile {}", path.display()))?;
        core::upload_profile(&client, profile).await?;
    }

    Ok(())
}
