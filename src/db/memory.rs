// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store backed by `DashMap`.
//!
//! Ledger writes hold the map's entry lock for the version comparison and the
//! replacement, so a stale write can never overwrite a newer one.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::db::{LedgerChange, LedgerFeed, LedgerStore};
use crate::error::{AppError, Result};
use crate::models::{AchievementDefinition, LedgerEntry, UserAchievement, UserProfile};

/// In-memory store.
#[derive(Default)]
pub struct MemoryStore {
    profiles: DashMap<String, UserProfile>,
    ledgers: DashMap<String, LedgerEntry>,
    /// Catalog in insertion order
    achievements: RwLock<Vec<AchievementDefinition>>,
    grants: DashMap<(String, String), UserAchievement>,
    feed: LedgerFeed,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a profile. Profiles normally come from the auth
    /// provider; this exists for development seeding and tests.
    pub fn upsert_profile(&self, profile: UserProfile) {
        self.profiles.insert(profile.id.clone(), profile);
    }

    /// Number of grant rows for a user (test helper).
    pub fn grant_count(&self, user_id: &str) -> usize {
        self.grants.iter().filter(|g| g.key().0 == user_id).count()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        Ok(self.profiles.get(user_id).map(|p| p.value().clone()))
    }

    async fn get_profiles_by_ids(&self, ids: &[String]) -> Result<HashMap<String, UserProfile>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.profiles.get(id).map(|p| (id.clone(), p.value().clone())))
            .collect())
    }

    async fn get_ledger(&self, user_id: &str) -> Result<Option<LedgerEntry>> {
        Ok(self.ledgers.get(user_id).map(|e| e.value().clone()))
    }

    async fn upsert_ledger(&self, entry: &LedgerEntry) -> Result<LedgerEntry> {
        let mut stored = entry.clone();
        stored.version = entry.version + 1;

        match self.ledgers.entry(entry.user_id.clone()) {
            Entry::Occupied(mut occupied) => {
                let current = occupied.get().version;
                if current != entry.version {
                    return Err(AppError::WriteConflict(format!(
                        "ledger {} is at version {}, write expected {}",
                        entry.user_id, current, entry.version
                    )));
                }
                occupied.insert(stored.clone());
            }
            Entry::Vacant(vacant) => {
                if entry.version != 0 {
                    return Err(AppError::WriteConflict(format!(
                        "ledger {} no longer exists, write expected version {}",
                        entry.user_id, entry.version
                    )));
                }
                vacant.insert(stored.clone());
            }
        }

        self.feed.publish(LedgerChange {
            user_id: stored.user_id.clone(),
            total_points: stored.total_points,
            version: stored.version,
        });

        Ok(stored)
    }

    async fn list_ledgers(&self) -> Result<Vec<LedgerEntry>> {
        Ok(self.ledgers.iter().map(|e| e.value().clone()).collect())
    }

    async fn list_achievements(&self) -> Result<Vec<AchievementDefinition>> {
        let catalog = self
            .achievements
            .read()
            .map_err(|_| AppError::Database("Achievement catalog lock poisoned".to_string()))?;
        Ok(catalog.clone())
    }

    async fn upsert_achievement(&self, definition: &AchievementDefinition) -> Result<()> {
        let mut catalog = self
            .achievements
            .write()
            .map_err(|_| AppError::Database("Achievement catalog lock poisoned".to_string()))?;

        match catalog.iter_mut().find(|d| d.id == definition.id) {
            Some(existing) => *existing = definition.clone(),
            None => catalog.push(definition.clone()),
        }
        Ok(())
    }

    async fn list_granted_achievements(&self, user_id: &str) -> Result<Vec<String>> {
        Ok(self
            .grants
            .iter()
            .filter(|g| g.key().0 == user_id)
            .map(|g| g.value().achievement_id.clone())
            .collect())
    }

    async fn grant_achievement(&self, user_id: &str, achievement_id: &str) -> Result<bool> {
        match self
            .grants
            .entry((user_id.to_string(), achievement_id.to_string()))
        {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(vacant) => {
                vacant.insert(UserAchievement {
                    user_id: user_id.to_string(),
                    achievement_id: achievement_id.to_string(),
                    earned_at: chrono::Utc::now(),
                });
                Ok(true)
            }
        }
    }

    fn feed(&self) -> &LedgerFeed {
        &self.feed
    }
}
