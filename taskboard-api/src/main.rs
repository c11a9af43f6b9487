//! # Task Board API Server
//!
//! Multi-user task board: users register, log in with JWTs (bearer header or
//! cookie), and manage their own tasks.
//!
//! ## Usage
//!
//! ```bash
//! JWT_SECRET=$(openssl rand -hex 32) DATABASE_URL=postgresql://localhost/taskboard \
//!     cargo run -p taskboard-api
//! ```
//!
//! Set `STORAGE_BACKEND=memory` to run without PostgreSQL, and `LOG_FORMAT=json`
//! for JSON log lines. `RUST_LOG` overrides the default log filter.

use std::sync::Arc;

use anyhow::Context;
use taskboard_api::{
    app::{build_router, AppState},
    config::{Config, StorageBackend},
};
use taskboard_shared::db::{
    migrations::run_migrations,
    pool::{close_pool, create_pool, DatabaseConfig},
};
use taskboard_shared::store::{MemoryStore, PgStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "taskboard_api=debug,tower_http=debug".into()),
    );
    if std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!(
        "Task Board API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env().context("Failed to load configuration")?;
    let bind_address = config.bind_address();

    let (state, pool) = match config.database.backend {
        StorageBackend::Postgres => {
            let pool = create_pool(DatabaseConfig {
                url: config.database.url.clone(),
                max_connections: config.database.max_connections,
                ..DatabaseConfig::default()
            })
            .await
            .context("Failed to connect to PostgreSQL")?;

            run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;

            let store = Arc::new(PgStore::new(pool.clone()));
            (AppState::new(store, config), Some(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            (AppState::new(Arc::new(MemoryStore::new()), config), None)
        }
    };

    if state.config.auth.csrf_enabled {
        tracing::info!("CSRF checks enabled for unsafe methods");
    }

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(pool) = pool {
        close_pool(pool).await;
    }
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
