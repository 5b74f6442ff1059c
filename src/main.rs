// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reward-Ledger API Server
//!
//! Records points earned through app activities, grants achievements and
//! serves the leaderboard.

use reward_ledger::{
    config::{Config, StoreBackend},
    db::{FirestoreDb, LedgerStore, MemoryStore},
    services::AchievementCatalog,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        backend = ?config.store_backend,
        level_divisor = config.level_divisor,
        "Starting Reward-Ledger API"
    );

    let store: Arc<dyn LedgerStore> = match config.store_backend {
        StoreBackend::Firestore => Arc::new(FirestoreDb::new(&config.gcp_project_id).await?),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    // Seed achievement catalog
    if let Some(path) = config.achievements_seed_path.as_deref() {
        tracing::info!(path, "Loading achievement catalog");
        let catalog = AchievementCatalog::load_from_file(path)?;
        catalog.seed(store.as_ref()).await?;
    }

    let state = Arc::new(AppState::new(config.clone(), store));

    // Build router
    let app = reward_ledger::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("reward_ledger=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
