use std::sync::Arc;

use minibank_api::app::build_app;
use minibank_ledger::LedgerService;
use minibank_ledger::store::memory::InMemoryBankStore;
use minibank_storage::PgBankStore;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    minibank_observability::init();

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| {
        tracing::info!(address = DEFAULT_BIND_ADDR, "BIND_ADDR not set; using default");
        DEFAULT_BIND_ADDR.to_string()
    });

    let app = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let store = PgBankStore::connect(&url).await?;
            store.run_migrations().await?;
            build_app(Arc::new(LedgerService::new(store)))
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set; using in-memory store (state is not persisted)");
            build_app(Arc::new(LedgerService::new(InMemoryBankStore::new())))
        }
    };

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %listener.local_addr()?, "server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("graceful shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received, draining connections");
}
