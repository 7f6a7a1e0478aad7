//! chainrisk-web: HTTP gateway for the supply-chain risk data contract.
//!
//! Serves analyze/predict/train, the global summary, per-country history,
//! orders, shipments and inventory, and login/register, plus an SSE feed
//! of scoring and training activity.

pub mod auth;
pub mod collector;
pub mod engine;
pub mod handlers;
pub mod news;
pub mod router;
pub mod sse;
pub mod state;
pub mod store;
pub mod supply;

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::state::{AppState, SharedState};

/// Serve the gateway on `listener` until `shutdown` resolves.
/// Starts the collector when it is enabled.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let shared: SharedState = Arc::new(state);
    let collector = shared.config.collector.enabled.then(|| {
        info!(
            countries = shared.config.collector.countries.len(),
            interval_minutes = shared.config.collector.interval_minutes,
            "starting risk collector"
        );
        collector::spawn_collector(
            shared.engine.clone(),
            shared.config.collector.clone(),
            shared.event_tx.clone(),
        )
    });

    let app = router::build_router(shared);
    info!(addr = %listener.local_addr()?, "gateway listening");
    let result = axum::serve(listener, app).with_graceful_shutdown(shutdown).await;

    if let Some(handle) = collector {
        handle.abort();
    }
    result?;
    Ok(())
}
