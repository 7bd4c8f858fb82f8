use std::sync::Arc;

use sendgrid_relay::adapters::relay_routes;
use sendgrid_relay::config::RelayConfig;
use sendgrid_relay::mail::SendGridMailer;
use sendgrid_relay::pipeline::Pipeline;
use sendgrid_relay::secrets::{
    AccessTokenSource, GcpSecretManager, MetadataServerToken, StaticToken,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = RelayConfig::from_env()?;
    let client = config.http_client()?;

    // ── Ambient identity ────────────────────────────────────────────────
    let tokens: Arc<dyn AccessTokenSource> = match config.static_access_token.clone() {
        Some(token) => {
            tracing::warn!("Using static access token from GOOGLE_OAUTH_ACCESS_TOKEN");
            Arc::new(StaticToken::new(token))
        }
        None => Arc::new(MetadataServerToken::new(
            client.clone(),
            config.metadata_host.clone(),
        )),
    };

    // ── Pipeline ────────────────────────────────────────────────────────
    let secrets = Arc::new(GcpSecretManager::new(
        client.clone(),
        config.secret_manager_endpoint.clone(),
        tokens,
    ));
    let mailer = Arc::new(SendGridMailer::new(client, config.sendgrid_api_base.clone()));
    let app = relay_routes(Pipeline::new(secrets, mailer));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(
        addr = %config.bind_addr,
        sendgrid = %config.sendgrid_api_base,
        secret_manager = %config.secret_manager_endpoint,
        "SendGrid relay v{} listening",
        env!("CARGO_PKG_VERSION")
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
