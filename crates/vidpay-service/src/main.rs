//! Vidpay service entry point.

use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use vidpay_service::{create_router, AppState, ServiceConfig};
use vidpay_store::{MemStore, PgStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,vidpay_service=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServiceConfig::from_env();

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url).await?;
            Arc::new(store)
        }
        None => {
            tracing::warn!(
                "DATABASE_URL not set - using in-memory store; all state is lost on restart"
            );
            Arc::new(MemStore::new())
        }
    };

    let listen_addr = config.listen_addr.clone();
    let state = AppState::new(store, config);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(addr = %listen_addr, "vidpay service listening");

    axum::serve(listener, router).await?;

    Ok(())
}
