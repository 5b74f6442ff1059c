// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Points update workflow.
//!
//! Applies an earned-points delta to a user's ledger:
//! 1. Verify the user has a profile
//! 2. Read the current ledger entry (or start a fresh one)
//! 3. Compute the new totals, level, rank and streaks in memory
//! 4. Write back conditional on the version that was read
//!
//! A version mismatch means another request won the race. The whole
//! read-compute-write is then repeated with fresh data, up to the configured
//! number of retries.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::db::LedgerStore;
use crate::error::{AppError, Result};
use crate::models::{LedgerEntry, RewardSource};
use crate::services::guarded;

/// Applies point deltas with optimistic concurrency.
#[derive(Clone)]
pub struct PointsService {
    store: Arc<dyn LedgerStore>,
    level_divisor: u64,
    max_write_retries: u32,
    timeout: Duration,
}

impl PointsService {
    pub fn new(store: Arc<dyn LedgerStore>, config: &Config) -> Self {
        Self {
            store,
            level_divisor: config.level_divisor.max(1),
            max_write_retries: config.max_write_retries,
            timeout: config.backend_timeout,
        }
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Current ledger entry for a user, if they have earned anything yet.
    pub async fn get_ledger(&self, user_id: &str) -> Result<Option<LedgerEntry>> {
        guarded(self.timeout, self.store.get_ledger(user_id)).await
    }

    /// Apply `delta` points from `source` to the user's ledger.
    ///
    /// Returns the stored entry. Fails with `NotFound` for an unknown user,
    /// `Validation` for a negative delta, `AlreadyClaimed` for a second daily
    /// login on the same UTC day and `WriteConflict` once retries run out.
    pub async fn apply_points(
        &self,
        user_id: &str,
        delta: i64,
        source: RewardSource,
    ) -> Result<LedgerEntry> {
        let delta = u64::try_from(delta).map_err(|_| {
            AppError::Validation(format!("Points delta must not be negative, got {}", delta))
        })?;

        if guarded(self.timeout, self.store.get_profile(user_id))
            .await?
            .is_none()
        {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }

        let mut attempt = 0;
        loop {
            match self.try_apply(user_id, delta, source).await {
                Ok(entry) => {
                    tracing::info!(
                        user_id,
                        delta,
                        source = source.as_str(),
                        total_points = entry.total_points,
                        level = entry.level,
                        attempt,
                        "Points applied"
                    );
                    return Ok(entry);
                }
                Err(err) if err.is_retryable() && attempt < self.max_write_retries => {
                    attempt += 1;
                    tracing::debug!(user_id, attempt, error = %err, "Ledger write conflict, retrying");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// One read-compute-write attempt.
    async fn try_apply(&self, user_id: &str, delta: u64, source: RewardSource) -> Result<LedgerEntry> {
        let now = chrono::Utc::now();
        let mut entry = guarded(self.timeout, self.store.get_ledger(user_id))
            .await?
            .unwrap_or_else(|| LedgerEntry::new(user_id, now));

        if source == RewardSource::DailyLogin && entry.claimed_daily_on(now) {
            return Err(AppError::AlreadyClaimed(
                "Daily reward already claimed today".to_string(),
            ));
        }

        entry.apply(delta, source, now, self.level_divisor);

        guarded(self.timeout, self.store.upsert_ledger(&entry)).await
    }
}
