//! `chainrisk`: command-line view over the client data layer.

mod cli;

use std::sync::Arc;

use anyhow::{anyhow, Context};
use chainrisk_client::{ClientError, DashboardService, DashboardState, FileTokenStore, RiskClient, Session};
use chainrisk_common::entities::{AnalyzeRequest, PredictRequest};
use chainrisk_common::supply::NewOrder;
use chainrisk_common::{FeatureVector, HistoryPoint, RiskAnalysis};
use chainrisk_config::Config;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Args, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load().context("loading configuration")?;
    if let Some(url) = args.api_url {
        config.api.base_url = url;
    }

    let store = Arc::new(FileTokenStore::new(&config.client.token_path, config.api.token_key.clone()));
    let session = Arc::new(Session::restore(store).await?);
    let service = DashboardService::new(RiskClient::new(config.api.clone(), session));

    match run(&service, args.command).await {
        Err(e) if e.is_auth() => Err(anyhow!("{} (run `chainrisk login`)", e.message())),
        other => other.map_err(|e| anyhow!(e.message())),
    }
}

async fn run(service: &DashboardService, command: Command) -> Result<(), ClientError> {
    let client = service.client();
    match command {
        Command::Login { email, password } => {
            client.login(&email, &password).await?;
            println!("Logged in as {}", email.trim());
        }
        Command::Register { name, email, password } => {
            let resp = client.register(&name, &email, &password).await?;
            println!("{}", resp.message);
        }
        Command::Logout => {
            client.logout().await?;
            println!("Logged out");
        }
        Command::Analyze { country, text } => {
            let analysis = in_flight(service.analyze(&AnalyzeRequest { country, text }).await)?;
            print_analysis(&analysis);
        }
        Command::Predict { country, text, features } => {
            let features = features
                .map(|raw| serde_json::from_str::<FeatureVector>(&raw))
                .transpose()
                .map_err(|e| ClientError::validation(format!("features: {}", e)))?;
            let prediction = in_flight(service.predict(&PredictRequest { country, text, features }).await)?;
            println!("Risk score: {:.2} ({})", prediction.risk_score, prediction.status);
        }
        Command::Train { wait } => {
            let resp = in_flight(service.train(!wait).await)?;
            match resp.metrics {
                Some(m) => println!("Trained: MAE {:.3}, R² {:.3}, {} training rows", m.mae, m.r2, m.n_train),
                None => println!("Training started in the background"),
            }
        }
        Command::Summary => {
            in_flight(service.refresh_summary().await)?;
            print_summary(&service.snapshot().await);
        }
        Command::History { country, days } => {
            let points = in_flight(service.load_history(&country, days).await)?;
            print_history(&country, &points);
        }
        Command::Dashboard { country, days } => {
            let state = service.load_dashboard(country.as_deref(), days).await?;
            print_summary(&state);
            if let Some(country) = country.as_deref() {
                if let Some(points) = state.history.get(country.trim()) {
                    print_history(country, points);
                }
            }
        }
        Command::AddOrder { order_id, country, supplier, qty, eta } => {
            let ack = client.create_order(&NewOrder { order_id, country, supplier, qty, eta }).await?;
            println!("Order {} recorded", ack.order_id.unwrap_or_default());
        }
        Command::Orders { limit } => {
            for o in client.orders(limit).await? {
                let eta = o.eta.as_deref().unwrap_or("-");
                println!("{:<12} {:<16} {:<24} {:>8}  eta {}", o.order_id, o.country, o.supplier, o.qty, eta);
            }
        }
        Command::Shipment { shipment_id, status } => {
            if let Some(status) = status {
                client.update_shipment_status(&shipment_id, &status).await?;
            }
            let s = client.shipment(&shipment_id).await?;
            println!("{} (order {}): {} -> {}, {}", s.shipment_id, s.order_id, s.origin, s.destination, s.status);
        }
        Command::Stock { sku, delta } => {
            if let Some(delta) = delta {
                client.adjust_inventory(&sku, delta).await?;
            }
            let item = client.inventory(&sku).await?;
            println!("{} at {}: {} on hand", item.sku, item.location, item.qty);
        }
    }
    Ok(())
}

/// A one-shot CLI never overlaps actions; `None` would mean it did.
fn in_flight<T>(result: Option<Result<T, ClientError>>) -> Result<T, ClientError> {
    result.unwrap_or_else(|| Err(ClientError::validation("a request is already in flight")))
}

fn print_analysis(a: &RiskAnalysis) {
    println!("{}: {:.2} ({}, {})", a.country, a.risk_score, a.risk_label, a.status);
    if !a.top_risk_factors.is_empty() {
        println!("Factors: {}", a.top_risk_factors.join(", "));
    }
    for article in &a.top_articles {
        println!("  - {} [{}]", article.title, article.source);
    }
    println!("{}", a.explanation);
}

fn print_summary(state: &DashboardState) {
    let Some(summary) = &state.summary else {
        return;
    };
    println!("Global summary at {}", summary.timestamp.format("%Y-%m-%d %H:%M UTC"));
    match summary.average_risk {
        Some(avg) => println!("Average risk: {:.2}", avg),
        None => {
            println!("No scores recorded yet");
            return;
        }
    }
    if let (Some(high), Some(low)) = (&summary.highest_risk, &summary.lowest_risk) {
        println!("Highest: {} ({:.2})  Lowest: {} ({:.2})", high.country, high.risk_score, low.country, low.risk_score);
    }
    println!("Top countries:");
    for c in &state.top {
        println!("  {:<20} {:>6.2}", c.country, c.risk_score);
    }
}

fn print_history(country: &str, points: &[HistoryPoint]) {
    println!("History for {} ({} points):", country.trim(), points.len());
    for p in points {
        println!("  {}  {:>6.2}", p.ts.format("%Y-%m-%d %H:%M"), p.risk_score);
    }
}
