use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    let config = reportdeck::AppConfig::from_env()?;
    let port = config.listen_port();

    let state = reportdeck::AppState::new(config);
    let app = reportdeck::router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "reportdeck listening");
    axum::serve(listener, app).await?;

    Ok(())
}
