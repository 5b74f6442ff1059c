// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Points update workflow tests against the in-memory store.

use async_trait::async_trait;
use reward_ledger::config::Config;
use reward_ledger::db::{LedgerFeed, LedgerStore, MemoryStore};
use reward_ledger::error::{AppError, Result};
use reward_ledger::models::{
    level_for, AchievementDefinition, LedgerEntry, RewardSource, UserProfile,
};
use reward_ledger::services::PointsService;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

mod common;
use common::memory_store;

#[tokio::test]
async fn test_first_claim_creates_ledger() {
    let store = memory_store(&["user_a"]);
    let points = PointsService::new(store.clone(), &Config::default());

    assert!(store.get_ledger("user_a").await.unwrap().is_none());
    assert!(store.list_ledgers().await.unwrap().is_empty());

    let ledger = points
        .apply_points("user_a", 30, RewardSource::Spin)
        .await
        .unwrap();

    assert_eq!(ledger.total_points, 30);
    assert_eq!(ledger.level, 1);
    assert_eq!(ledger.rank, "Bronze");
    assert_eq!(ledger.version, 1);
    assert_eq!(store.list_ledgers().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_sequential_claims_accumulate() {
    let store = memory_store(&["user_a"]);
    let points = PointsService::new(store.clone(), &Config::default());

    points
        .apply_points("user_a", 30, RewardSource::Spin)
        .await
        .unwrap();
    let ledger = points
        .apply_points("user_a", 90, RewardSource::Spin)
        .await
        .unwrap();

    assert_eq!(ledger.total_points, 120);
    assert_eq!(ledger.level, 2);
    assert_eq!(ledger.version, 2);
}

#[tokio::test]
async fn test_level_follows_configured_divisor() {
    let store = memory_store(&["user_a"]);
    let config = Config {
        level_divisor: 1000,
        ..Config::default()
    };
    let points = PointsService::new(store, &config);

    let mut total = 0u64;
    for delta in [250, 750, 999, 1] {
        let ledger = points
            .apply_points("user_a", delta, RewardSource::Farming)
            .await
            .unwrap();
        total += delta as u64;
        assert_eq!(ledger.total_points, total);
        assert_eq!(ledger.level, level_for(total, 1000));
    }
    // 2000 points at 1000 per level
    assert_eq!(level_for(total, 1000), 3);
}

#[tokio::test]
async fn test_rank_promotion() {
    let store = memory_store(&["user_a"]);
    let points = PointsService::new(store, &Config::default());

    let ledger = points
        .apply_points("user_a", 500, RewardSource::Farming)
        .await
        .unwrap();
    assert_eq!(ledger.rank, "Silver");

    let ledger = points
        .apply_points("user_a", 1000, RewardSource::Farming)
        .await
        .unwrap();
    assert_eq!(ledger.rank, "Gold");
}

#[tokio::test]
async fn test_unknown_user_gets_no_ledger() {
    let store = memory_store(&[]);
    let points = PointsService::new(store.clone(), &Config::default());

    let err = points
        .apply_points("nobody", 10, RewardSource::Spin)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    assert!(store.list_ledgers().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_breathing_sessions_counted() {
    let store = memory_store(&["user_a"]);
    let points = PointsService::new(store, &Config::default());

    for _ in 0..3 {
        points
            .apply_points("user_a", 5, RewardSource::Breathing)
            .await
            .unwrap();
    }
    let ledger = points.get_ledger("user_a").await.unwrap().unwrap();

    assert_eq!(ledger.sessions_completed, 3);
    assert_eq!(ledger.current_streak, 1);
}

#[tokio::test]
async fn test_ledger_change_notifications() {
    let store = memory_store(&["user_a"]);
    let points = PointsService::new(store.clone(), &Config::default());
    let mut rx = store.feed().subscribe();

    points
        .apply_points("user_a", 10, RewardSource::Spin)
        .await
        .unwrap();
    points
        .apply_points("user_a", 15, RewardSource::Spin)
        .await
        .unwrap();

    let first = rx.recv().await.unwrap();
    let second = rx.recv().await.unwrap();
    assert_eq!((first.total_points, first.version), (10, 1));
    assert_eq!((second.total_points, second.version), (25, 2));
}

/// How the wrapped store misbehaves.
#[derive(Clone, Copy)]
enum Fault {
    /// Every ledger write loses the version race.
    AlwaysConflict,
    /// Ledger reads take longer than the backend timeout.
    SlowReads(Duration),
}

/// Memory store with an injected ledger fault and an upsert counter.
struct FaultyLedgerStore {
    inner: MemoryStore,
    fault: Fault,
    upserts: AtomicU32,
}

impl FaultyLedgerStore {
    fn new(fault: Fault) -> Arc<Self> {
        let inner = MemoryStore::new();
        inner.upsert_profile(common::profile("user_a", Some("alice")));
        Arc::new(Self {
            inner,
            fault,
            upserts: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl LedgerStore for FaultyLedgerStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        self.inner.get_profile(user_id).await
    }

    async fn get_profiles_by_ids(&self, ids: &[String]) -> Result<HashMap<String, UserProfile>> {
        self.inner.get_profiles_by_ids(ids).await
    }

    async fn get_ledger(&self, user_id: &str) -> Result<Option<LedgerEntry>> {
        if let Fault::SlowReads(delay) = self.fault {
            tokio::time::sleep(delay).await;
        }
        self.inner.get_ledger(user_id).await
    }

    async fn upsert_ledger(&self, entry: &LedgerEntry) -> Result<LedgerEntry> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        if let Fault::AlwaysConflict = self.fault {
            return Err(AppError::WriteConflict(format!(
                "ledger {} moved past version {}",
                entry.user_id, entry.version
            )));
        }
        self.inner.upsert_ledger(entry).await
    }

    async fn list_ledgers(&self) -> Result<Vec<LedgerEntry>> {
        self.inner.list_ledgers().await
    }

    async fn list_achievements(&self) -> Result<Vec<AchievementDefinition>> {
        self.inner.list_achievements().await
    }

    async fn upsert_achievement(&self, definition: &AchievementDefinition) -> Result<()> {
        self.inner.upsert_achievement(definition).await
    }

    async fn list_granted_achievements(&self, user_id: &str) -> Result<Vec<String>> {
        self.inner.list_granted_achievements(user_id).await
    }

    async fn grant_achievement(&self, user_id: &str, achievement_id: &str) -> Result<bool> {
        self.inner.grant_achievement(user_id, achievement_id).await
    }

    fn feed(&self) -> &LedgerFeed {
        self.inner.feed()
    }
}

#[tokio::test]
async fn test_conflict_surfaces_after_retries_exhausted() {
    let store = FaultyLedgerStore::new(Fault::AlwaysConflict);
    let config = Config::default();
    let points = PointsService::new(store.clone(), &config);

    let err = points
        .apply_points("user_a", 10, RewardSource::Spin)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::WriteConflict(_)), "got {:?}", err);
    // First attempt plus every retry
    assert_eq!(
        store.upserts.load(Ordering::SeqCst),
        1 + config.max_write_retries
    );
    assert!(store.inner.get_ledger("user_a").await.unwrap().is_none());
}

#[tokio::test]
async fn test_zero_retries_makes_one_attempt() {
    let store = FaultyLedgerStore::new(Fault::AlwaysConflict);
    let config = Config {
        max_write_retries: 0,
        ..Config::default()
    };
    let points = PointsService::new(store.clone(), &config);

    let err = points
        .apply_points("user_a", 10, RewardSource::Spin)
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(store.upserts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_slow_backend_is_unavailable() {
    let store = FaultyLedgerStore::new(Fault::SlowReads(Duration::from_millis(500)));
    let config = Config {
        backend_timeout: Duration::from_millis(20),
        ..Config::default()
    };
    let points = PointsService::new(store.clone(), &config);

    let err = points
        .apply_points("user_a", 10, RewardSource::Spin)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::UpstreamUnavailable(_)), "got {:?}", err);
    // Timeouts are not retried and nothing is written
    assert_eq!(store.upserts.load(Ordering::SeqCst), 0);
}
