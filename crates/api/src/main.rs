use std::sync::Arc;

use anyhow::Context;

use accountgate_api::app::{build_app, AppServices};
use accountgate_auth::AuthressClient;
use accountgate_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may be set directly.
    let _ = dotenvy::dotenv();
    accountgate_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let authress =
        AuthressClient::new(config.authress.clone()).context("failed to build Authress client")?;
    let bind_addr = config.bind_addr;

    let app = build_app(AppServices::new(config, Arc::new(authress)));

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
