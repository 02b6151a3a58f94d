use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::signal;
use tracing_subscriber::EnvFilter;

use warehouse_orders::adapters::PostgresStore;
use warehouse_orders::api::{create_router, AppState};
use warehouse_orders::collaborators::{HttpGeocoder, TestPaymentGateway};
use warehouse_orders::config::AppConfig;
use warehouse_orders::core::{IdempotencyLayer, OrderService};
use warehouse_orders::error::Result;

#[derive(Parser)]
#[command(name = "warehouse-orders", about = "Order-placement service for a multi-warehouse backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server.
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run pending database migrations and exit.
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "falling back to ORDERS_DATABASE__URL env var for config");
        AppConfig::load_from("config").expect("configuration must be loadable")
    });

    let store = PostgresStore::new(&config.database.url, config.database.max_connections).await?;

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Migrate => {
            store.migrate().await?;
            tracing::info!("migrations complete");
        }
        Commands::Serve { port } => {
            store.migrate().await?;

            let geocoder = Arc::new(HttpGeocoder::new(
                std::env::var("GEOCODER_BASE_URL").unwrap_or_else(|_| "http://localhost:9000".into()),
            ));
            let payment = Arc::new(TestPaymentGateway::new());
            let idempotency =
                IdempotencyLayer::with_stale_after(store.pool().clone(), config.idempotency.stale_after_ms);
            let order_service = Arc::new(OrderService::new(store, idempotency, geocoder, payment));

            let state = AppState::new(order_service);
            let app = create_router(state, &config.server.cors_allowed_origins);

            let port = port.unwrap_or(config.server.port);
            let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
            tracing::info!(%addr, "starting order service");

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,warehouse_orders=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
