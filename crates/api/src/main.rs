use anyhow::Context;

use delegate_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("reading configuration")?;
    delegate_observability::init(config.log_format);

    for var in config.insecure_defaults() {
        tracing::warn!(var = *var, "not set; using insecure dev default");
    }

    let app = delegate_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
