//! ChainRisk API gateway.
//!
//! Run with: cargo run -p chainrisk-web --bin chainrisk-gateway

use chainrisk_config::Config;
use chainrisk_web::state::AppState;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load()?;
    let addr = config.server.bind_addr();
    info!("Starting ChainRisk gateway...");

    let state = AppState::new(config).await?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    chainrisk_web::serve(listener, state, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown requested");
    })
    .await
}
