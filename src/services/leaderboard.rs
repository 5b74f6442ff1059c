// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Leaderboard projection.
//!
//! Ranks ledger entries by total points and resolves display names with one
//! batch profile lookup. Nothing is cached; every call reads fresh data.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::db::LedgerStore;
use crate::error::Result;
use crate::models::user::placeholder_name;
use crate::models::{LedgerEntry, UserProfile};
use crate::services::guarded;

pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
pub const MAX_LEADERBOARD_LIMIT: usize = 100;

/// One ranked row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardRow {
    /// 1-based position
    pub position: u32,
    /// Internal user ID, not serialized to clients
    #[serde(skip)]
    pub user_id: String,
    pub display_name: String,
    pub total_points: u64,
    pub level: u32,
    pub current_streak: u32,
}

/// Leaderboard ordering: points descending, then the longer-standing score
/// (earlier `last_activity`), then user ID for a total order.
pub fn compare_entries(a: &LedgerEntry, b: &LedgerEntry) -> Ordering {
    b.total_points
        .cmp(&a.total_points)
        .then_with(|| a.last_activity.cmp(&b.last_activity))
        .then_with(|| a.user_id.cmp(&b.user_id))
}

/// Sort `entries` and keep the top `limit`.
pub fn top_entries(mut entries: Vec<LedgerEntry>, limit: usize) -> Vec<LedgerEntry> {
    entries.sort_by(compare_entries);
    entries.truncate(limit);
    entries
}

/// Build rows from already-ranked entries.
pub fn build_rows(ranked: &[LedgerEntry], profiles: &HashMap<String, UserProfile>) -> Vec<LeaderboardRow> {
    ranked
        .iter()
        .enumerate()
        .map(|(i, entry)| LeaderboardRow {
            position: u32::try_from(i + 1).unwrap_or(u32::MAX),
            user_id: entry.user_id.clone(),
            display_name: profiles
                .get(&entry.user_id)
                .map(UserProfile::display_name)
                .unwrap_or_else(|| placeholder_name(&entry.user_id)),
            total_points: entry.total_points,
            level: entry.level,
            current_streak: entry.current_streak,
        })
        .collect()
}

/// Read-only leaderboard view.
#[derive(Clone)]
pub struct LeaderboardService {
    store: Arc<dyn LedgerStore>,
    timeout: Duration,
}

impl LeaderboardService {
    pub fn new(store: Arc<dyn LedgerStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Top `limit` users (clamped to `1..=MAX_LEADERBOARD_LIMIT`).
    ///
    /// A failed profile lookup degrades to placeholder names rather than
    /// failing the whole leaderboard.
    pub async fn top(&self, limit: usize) -> Result<Vec<LeaderboardRow>> {
        let limit = limit.clamp(1, MAX_LEADERBOARD_LIMIT);

        let entries = guarded(self.timeout, self.store.list_ledgers()).await?;
        let ranked = top_entries(entries, limit);

        let ids: Vec<String> = ranked.iter().map(|e| e.user_id.clone()).collect();
        let profiles = match guarded(self.timeout, self.store.get_profiles_by_ids(&ids)).await {
            Ok(profiles) => profiles,
            Err(e) => {
                tracing::warn!(error = %e, count = ids.len(), "Profile lookup failed, using placeholders");
                HashMap::new()
            }
        };

        Ok(build_rows(&ranked, &profiles))
    }
}
