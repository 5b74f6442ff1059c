// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Profiles (written by the auth provider, read here)
//! - Ledgers (one document per user, versioned)
//! - Achievements (catalog) and user achievements (grant join collection)
//!
//! Ledger change notifications are published from `upsert_ledger` in this
//! process only. With several instances behind a load balancer, a
//! leaderboard stream sees only the writes made by its own instance.

use std::collections::HashMap;

use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::{FirestoreConsistencySelector, FirestoreQueryDirection};
use futures_util::StreamExt;

use crate::db::{collections, LedgerChange, LedgerFeed, LedgerStore};
use crate::error::{AppError, Result};
use crate::models::{AchievementDefinition, LedgerEntry, UserAchievement, UserProfile};

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
    feed: LedgerFeed,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id).await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("Failed to connect to Firestore: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
            feed: LedgerFeed::default(),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::UpstreamUnavailable(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
            feed: LedgerFeed::default(),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self {
            client: None,
            feed: LedgerFeed::default(),
        }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb> {
        self.client.as_ref().ok_or_else(|| {
            AppError::UpstreamUnavailable("Database not connected (offline mode)".to_string())
        })
    }

    /// Create or replace a profile.
    ///
    /// Profiles are owned by the auth provider; this is for seeding and tests.
    pub async fn upsert_profile(&self, profile: &UserProfile) -> Result<()> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PROFILES)
            .document_id(&profile.id)
            .object(profile)
            .execute()
            .await
            .map_err(db_error)?;
        Ok(())
    }
}

/// Map a Firestore error, separating transport failures from data errors.
fn db_error(err: FirestoreError) -> AppError {
    match err {
        FirestoreError::NetworkError(e) => AppError::UpstreamUnavailable(e.to_string()),
        other => AppError::Database(other.to_string()),
    }
}

/// Map an error from any step of a transaction (begin, read or commit).
///
/// Contention may surface on the read as well as on the commit; both are
/// reported as a write conflict so the caller retries with fresh data.
fn transaction_error(key: &str, err: FirestoreError) -> AppError {
    match err {
        FirestoreError::DatabaseError(ref db_err) if db_err.retry_possible => {
            AppError::WriteConflict(format!("Transaction on {} aborted: {}", key, err))
        }
        FirestoreError::DataConflictError(_) => {
            AppError::WriteConflict(format!("Transaction on {} conflicted: {}", key, err))
        }
        other => db_error(other),
    }
}

#[async_trait]
impl LedgerStore for FirestoreDb {
    // ─── Profile Operations ──────────────────────────────────────

    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PROFILES)
            .obj()
            .one(user_id)
            .await
            .map_err(db_error)
    }

    /// Fetch profiles with a single BatchGetDocuments call.
    async fn get_profiles_by_ids(&self, ids: &[String]) -> Result<HashMap<String, UserProfile>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let stream = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PROFILES)
            .obj::<UserProfile>()
            .batch(ids.to_vec())
            .await
            .map_err(db_error)?;

        Ok(stream
            .filter_map(|(id, profile)| async move { profile.map(|p| (id, p)) })
            .collect::<HashMap<String, UserProfile>>()
            .await)
    }

    // ─── Ledger Operations ───────────────────────────────────────

    async fn get_ledger(&self, user_id: &str) -> Result<Option<LedgerEntry>> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::LEDGERS)
            .obj()
            .one(user_id)
            .await
            .map_err(db_error)
    }

    /// Versioned write inside a Firestore transaction.
    ///
    /// The read happens within the transaction, so Firestore also aborts the
    /// commit if another writer touches the document in between.
    async fn upsert_ledger(&self, entry: &LedgerEntry) -> Result<LedgerEntry> {
        let client = self.get_client()?;
        let user_id = entry.user_id.as_str();

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| transaction_error(user_id, e))?;

        let tx_db = client.clone_with_consistency_selector(
            FirestoreConsistencySelector::Transaction(transaction.transaction_id().clone()),
        );

        let current: Option<LedgerEntry> = tx_db
            .fluent()
            .select()
            .by_id_in(collections::LEDGERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| transaction_error(user_id, e))?;

        let current_version = current.as_ref().map(|c| c.version).unwrap_or(0);
        if current_version != entry.version {
            let _ = transaction.rollback().await;
            return Err(AppError::WriteConflict(format!(
                "ledger {} is at version {}, write expected {}",
                user_id, current_version, entry.version
            )));
        }

        let mut stored = entry.clone();
        stored.version = entry.version + 1;

        client
            .fluent()
            .update()
            .in_col(collections::LEDGERS)
            .document_id(user_id)
            .object(&stored)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add ledger to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| transaction_error(user_id, e))?;

        tracing::debug!(
            user_id,
            version = stored.version,
            total_points = stored.total_points,
            "Ledger committed"
        );

        self.feed.publish(LedgerChange {
            user_id: stored.user_id.clone(),
            total_points: stored.total_points,
            version: stored.version,
        });

        Ok(stored)
    }

    async fn list_ledgers(&self) -> Result<Vec<LedgerEntry>> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::LEDGERS)
            .order_by([("total_points", FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(db_error)
    }

    // ─── Achievement Operations ──────────────────────────────────

    /// Catalog order for Firestore is ascending achievement ID.
    async fn list_achievements(&self) -> Result<Vec<AchievementDefinition>> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::ACHIEVEMENTS)
            .order_by([("id", FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(db_error)
    }

    async fn upsert_achievement(&self, definition: &AchievementDefinition) -> Result<()> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ACHIEVEMENTS)
            .document_id(&definition.id)
            .object(definition)
            .execute()
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn list_granted_achievements(&self, user_id: &str) -> Result<Vec<String>> {
        let user_id = user_id.to_string();
        let grants: Vec<UserAchievement> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USER_ACHIEVEMENTS)
            .filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
            .obj()
            .query()
            .await
            .map_err(db_error)?;

        Ok(grants.into_iter().map(|g| g.achievement_id).collect())
    }

    /// Create the grant document unless it already exists.
    async fn grant_achievement(&self, user_id: &str, achievement_id: &str) -> Result<bool> {
        let client = self.get_client()?;
        let doc_id = UserAchievement::doc_id(user_id, achievement_id);

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| transaction_error(&doc_id, e))?;

        let tx_db = client.clone_with_consistency_selector(
            FirestoreConsistencySelector::Transaction(transaction.transaction_id().clone()),
        );

        let existing: Option<UserAchievement> = tx_db
            .fluent()
            .select()
            .by_id_in(collections::USER_ACHIEVEMENTS)
            .obj()
            .one(&doc_id)
            .await
            .map_err(|e| transaction_error(&doc_id, e))?;

        if existing.is_some() {
            let _ = transaction.rollback().await;
            return Ok(false);
        }

        let grant = UserAchievement {
            user_id: user_id.to_string(),
            achievement_id: achievement_id.to_string(),
            earned_at: chrono::Utc::now(),
        };

        client
            .fluent()
            .update()
            .in_col(collections::USER_ACHIEVEMENTS)
            .document_id(&doc_id)
            .object(&grant)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add grant to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| transaction_error(&doc_id, e))?;

        Ok(true)
    }

    fn feed(&self) -> &LedgerFeed {
        &self.feed
    }
}
