//! Bookstore server: resolves the descriptor, resets and seeds PostgreSQL, then serves the
//! entity and common routes.
//!
//! Run from repo root: `cargo run -p bookstore-server`

use bookstore::{app, bootstrap, ensure_database_exists, AppState, PgStore, Settings};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bookstore=info,bookstore_server=info,tower_http=info")),
        )
        .init();

    let model = settings.load_model().await?;
    ensure_database_exists(&settings.database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&settings.database_url)
        .await?;
    let store = Arc::new(PgStore::new(pool));

    if settings.reset_on_start {
        let seed = settings.load_seed().await?;
        bootstrap(store.as_ref(), &model, &seed).await?;
    }

    let state = AppState::new(store, model);
    let router = app(state, settings.body_limit);

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
