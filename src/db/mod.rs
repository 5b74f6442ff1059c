//! Database layer.
//!
//! [`LedgerStore`] is the data-access seam for the points workflow. Two
//! backends implement it: Firestore for production and an in-process
//! [`MemoryStore`] for local development and tests.

pub mod feed;
pub mod firestore;
pub mod memory;

pub use feed::{LedgerChange, LedgerFeed, Subscription};
pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{AchievementDefinition, LedgerEntry, UserProfile};

/// Collection names as constants.
pub mod collections {
    pub const PROFILES: &str = "profiles";
    /// Points ledger (keyed by user_id)
    pub const LEDGERS: &str = "ledgers";
    pub const ACHIEVEMENTS: &str = "achievements";
    /// Granted achievements (keyed by `{user_id}_{achievement_id}`)
    pub const USER_ACHIEVEMENTS: &str = "user_achievements";
}

/// Data access for profiles, the points ledger and achievements.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>>;

    /// Batch profile lookup. Unknown IDs are absent from the map.
    async fn get_profiles_by_ids(&self, ids: &[String]) -> Result<HashMap<String, UserProfile>>;

    async fn get_ledger(&self, user_id: &str) -> Result<Option<LedgerEntry>>;

    /// Write a ledger entry if the stored version still equals `entry.version`.
    ///
    /// Version 0 means the entry must not exist yet. On success the stored
    /// entry (with its version bumped) is returned and a [`LedgerChange`] is
    /// published; on mismatch this fails with `AppError::WriteConflict`.
    async fn upsert_ledger(&self, entry: &LedgerEntry) -> Result<LedgerEntry>;

    async fn list_ledgers(&self) -> Result<Vec<LedgerEntry>>;

    /// All achievement definitions, in catalog order.
    async fn list_achievements(&self) -> Result<Vec<AchievementDefinition>>;

    /// Insert or replace a definition (administrative seeding).
    async fn upsert_achievement(&self, definition: &AchievementDefinition) -> Result<()>;

    async fn list_granted_achievements(&self, user_id: &str) -> Result<Vec<String>>;

    /// Record a grant. Returns `false` if the pair was already granted.
    async fn grant_achievement(&self, user_id: &str, achievement_id: &str) -> Result<bool>;

    /// Change notifications for this store's ledger writes.
    fn feed(&self) -> &LedgerFeed;

    /// Register a callback invoked after every ledger mutation.
    fn subscribe_to_ledger_changes(
        &self,
        callback: Box<dyn FnMut(LedgerChange) + Send + 'static>,
    ) -> Subscription {
        self.feed().on_change(callback)
    }
}
