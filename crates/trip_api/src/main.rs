use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use trip_api::create_app;
use trip_engine::{Engine, ServiceConfig};

/// Command line arguments for the trip planner server
#[derive(Parser, Debug)]
#[command(name = "ev-trip-planner")]
#[command(about = "EV trip planner with charging schedules and live vehicle status")]
struct Args {
    /// Path to the service configuration JSON file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to bind the server to
    #[arg(short, long, default_value = "8080")]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt().pretty().init();

    let config = match &args.config {
        Some(path) => {
            let config = ServiceConfig::load(path)?;
            tracing::info!(
                "Loaded config from {}: {} station(s), {} vehicle profile(s)",
                path.display(),
                config.stations.len(),
                config.vehicles.len()
            );
            config
        }
        None => {
            tracing::warn!("No config file given, starting with an empty station catalog");
            ServiceConfig::default()
        }
    };

    let engine = Arc::new(Engine::new(config).context("Invalid service configuration")?);
    let app = create_app(engine.clone());

    let bind_addr = format!("0.0.0.0:{}", args.port);
    tracing::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("Server error")?;

    engine.shutdown().await;
    Ok(())
}
