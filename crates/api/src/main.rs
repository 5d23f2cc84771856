use anyhow::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    spendwise_observability::init();

    let config = spendwise_api::config::ApiConfig::from_env().context("invalid configuration")?;
    tracing::info!(
        access_ttl_secs = config.auth.access_ttl().num_seconds(),
        refresh_ttl_secs = config.auth.refresh_ttl().num_seconds(),
        "auth configuration loaded"
    );

    let app = spendwise_api::app::build_app(&config.auth);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
