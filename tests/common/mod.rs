// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use reward_ledger::config::Config;
use reward_ledger::db::{FirestoreDb, LedgerStore, MemoryStore};
use reward_ledger::middleware::auth::create_jwt;
use reward_ledger::models::{AchievementDefinition, RequirementType, UserProfile};
use reward_ledger::routes::create_router;
use reward_ledger::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Profile with a username.
#[allow(dead_code)]
pub fn profile(id: &str, username: Option<&str>) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        username: username.map(String::from),
        email: Some(format!("{}@example.com", id)),
    }
}

/// In-memory store with the given users registered.
#[allow(dead_code)]
pub fn memory_store(user_ids: &[&str]) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for id in user_ids {
        store.upsert_profile(profile(id, Some(format!("{}_name", id).as_str())));
    }
    store
}

/// Achievement definition shorthand.
#[allow(dead_code)]
pub fn achievement(
    id: &str,
    requirement_type: RequirementType,
    requirement_value: u64,
    points_reward: u64,
) -> AchievementDefinition {
    AchievementDefinition {
        id: id.to_string(),
        name: id.replace('_', " "),
        description: String::new(),
        icon: String::new(),
        requirement_type,
        requirement_value,
        points_reward,
    }
}

/// App state over a memory store.
#[allow(dead_code)]
pub fn test_state(store: Arc<MemoryStore>) -> Arc<AppState> {
    let store: Arc<dyn LedgerStore> = store;
    Arc::new(AppState::new(Config::default(), store))
}

/// Create a test app over a memory store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app(store: Arc<MemoryStore>) -> (axum::Router, Arc<AppState>) {
    let state = test_state(store);
    (create_router(state.clone()), state)
}

/// Create a session JWT accepted by the test app.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, state: &AppState) -> String {
    create_jwt(
        user_id,
        &state.config.jwt_audience,
        &state.config.jwt_signing_key,
    )
    .expect("Failed to create JWT")
}
