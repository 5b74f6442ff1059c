//! Per-user points ledger.
//!
//! One entry per user, keyed by user id. Every mutation goes through a
//! versioned compare-and-set in the store, so the in-memory helpers here only
//! compute the next state; they never persist anything themselves.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Default points-per-level divisor.
pub const DEFAULT_LEVEL_DIVISOR: u64 = 100;

/// Where a batch of points came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardSource {
    /// Once-per-day login reward
    DailyLogin,
    /// Spin/roulette wheel
    Spin,
    /// Completed breathing exercise (counts as a session)
    Breathing,
    /// Farming calculator payout
    Farming,
    /// Bonus from a newly granted achievement (server-side only)
    AchievementBonus,
}

impl RewardSource {
    /// Whether a client is allowed to claim points from this source directly.
    pub fn is_client_claimable(self) -> bool {
        !matches!(self, RewardSource::AchievementBonus)
    }

    /// Whether claims from this source count as user activity (streaks).
    fn counts_as_activity(self) -> bool {
        !matches!(self, RewardSource::AchievementBonus)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RewardSource::DailyLogin => "daily_login",
            RewardSource::Spin => "spin",
            RewardSource::Breathing => "breathing",
            RewardSource::Farming => "farming",
            RewardSource::AchievementBonus => "achievement_bonus",
        }
    }
}

/// Rank label derived from total points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RankTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
}

impl RankTier {
    /// Tier thresholds, highest first.
    const THRESHOLDS: [(u64, RankTier); 5] = [
        (10_000, RankTier::Diamond),
        (5_000, RankTier::Platinum),
        (1_500, RankTier::Gold),
        (500, RankTier::Silver),
        (0, RankTier::Bronze),
    ];

    pub fn for_points(total_points: u64) -> Self {
        Self::THRESHOLDS
            .iter()
            .find(|(min, _)| total_points >= *min)
            .map(|(_, tier)| *tier)
            .unwrap_or(RankTier::Bronze)
    }

    pub fn label(self) -> &'static str {
        match self {
            RankTier::Bronze => "Bronze",
            RankTier::Silver => "Silver",
            RankTier::Gold => "Gold",
            RankTier::Platinum => "Platinum",
            RankTier::Diamond => "Diamond",
        }
    }
}

/// Compute the level for a point total: `floor(total / divisor) + 1`.
///
/// A zero divisor is rejected by config loading; it is clamped to 1 here so
/// the function stays total.
pub fn level_for(total_points: u64, divisor: u64) -> u32 {
    let level = total_points / divisor.max(1) + 1;
    u32::try_from(level).unwrap_or(u32::MAX)
}

/// Stored ledger entry.
///
/// Stored at: `ledgers/{user_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Owner (also used as document ID)
    pub user_id: String,
    /// Cumulative points, never decreases
    pub total_points: u64,
    /// Derived from `total_points` and the configured divisor
    pub level: u32,
    /// Rank label ("Bronze", "Silver", ...)
    pub rank: String,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub longest_streak: u32,
    /// Completed exercise sessions
    #[serde(default)]
    pub sessions_completed: u32,
    /// UTC date of the last daily-login claim
    #[serde(default)]
    pub last_daily_claim: Option<NaiveDate>,
    /// UTC date the streak was last extended; bonuses never move it
    #[serde(default)]
    pub last_streak_day: Option<NaiveDate>,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Optimistic concurrency token. 0 means "not yet stored"; the store
    /// bumps it on every successful write.
    #[serde(default)]
    pub version: u64,
}

impl LedgerEntry {
    /// A fresh, unstored entry with zero points.
    pub fn new(user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            total_points: 0,
            level: 1,
            rank: RankTier::Bronze.label().to_string(),
            current_streak: 0,
            longest_streak: 0,
            sessions_completed: 0,
            last_daily_claim: None,
            last_streak_day: None,
            last_activity: now,
            created_at: now,
            version: 0,
        }
    }

    /// Whether the daily login reward was already claimed on `now`'s UTC day.
    pub fn claimed_daily_on(&self, now: DateTime<Utc>) -> bool {
        self.last_daily_claim == Some(now.date_naive())
    }

    /// Apply a points delta in memory.
    ///
    /// Recomputes level and rank, and for activity sources also the streak,
    /// session count and daily-claim date. `version` is left as read so the
    /// store can compare it on write.
    pub fn apply(&mut self, delta: u64, source: RewardSource, now: DateTime<Utc>, divisor: u64) {
        self.total_points = self.total_points.saturating_add(delta);
        self.level = level_for(self.total_points, divisor);
        self.rank = RankTier::for_points(self.total_points).label().to_string();

        if source.counts_as_activity() {
            self.update_streak(now);
            if source == RewardSource::Breathing {
                self.sessions_completed = self.sessions_completed.saturating_add(1);
            }
            if source == RewardSource::DailyLogin {
                self.last_daily_claim = Some(now.date_naive());
            }
        }

        self.last_activity = now;
    }

    /// Streaks count consecutive UTC calendar days with activity.
    fn update_streak(&mut self, now: DateTime<Utc>) {
        let today = now.date_naive();
        match self.last_streak_day {
            Some(day) if self.current_streak > 0 => match (today - day).num_days() {
                d if d <= 0 => {}
                1 => self.current_streak = self.current_streak.saturating_add(1),
                _ => self.current_streak = 1,
            },
            _ => self.current_streak = 1,
        }
        self.last_streak_day = Some(self.last_streak_day.map_or(today, |day| day.max(today)));
        self.longest_streak = self.longest_streak.max(self.current_streak);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_level_formula() {
        for total in [0u64, 1, 99, 100, 101, 199, 200, 12_345] {
            assert_eq!(level_for(total, 100) as u64, total / 100 + 1, "total {}", total);
        }
        assert_eq!(level_for(999, 1000), 1);
        assert_eq!(level_for(1000, 1000), 2);
    }

    #[test]
    fn test_rank_thresholds() {
        assert_eq!(RankTier::for_points(0), RankTier::Bronze);
        assert_eq!(RankTier::for_points(499), RankTier::Bronze);
        assert_eq!(RankTier::for_points(500), RankTier::Silver);
        assert_eq!(RankTier::for_points(1_500), RankTier::Gold);
        assert_eq!(RankTier::for_points(9_999), RankTier::Platinum);
        assert_eq!(RankTier::for_points(10_000), RankTier::Diamond);
    }

    #[test]
    fn test_apply_first_delta() {
        let now = at(2024, 3, 1, 9);
        let mut entry = LedgerEntry::new("user-a", now);
        entry.apply(30, RewardSource::Spin, now, 100);

        assert_eq!(entry.total_points, 30);
        assert_eq!(entry.level, 1);
        assert_eq!(entry.rank, "Bronze");
        assert_eq!(entry.current_streak, 1);
        assert_eq!(entry.longest_streak, 1);
        assert_eq!(entry.version, 0);
    }

    #[test]
    fn test_streak_consecutive_days_and_gap() {
        let mut entry = LedgerEntry::new("user-a", at(2024, 3, 1, 9));
        entry.apply(10, RewardSource::Spin, at(2024, 3, 1, 9), 100);
        entry.apply(10, RewardSource::Spin, at(2024, 3, 1, 22), 100);
        assert_eq!(entry.current_streak, 1);

        entry.apply(10, RewardSource::Spin, at(2024, 3, 2, 8), 100);
        entry.apply(10, RewardSource::Spin, at(2024, 3, 3, 8), 100);
        assert_eq!(entry.current_streak, 3);

        entry.apply(10, RewardSource::Spin, at(2024, 3, 6, 8), 100);
        assert_eq!(entry.current_streak, 1);
        assert_eq!(entry.longest_streak, 3);
    }

    #[test]
    fn test_bonus_after_midnight_keeps_streak_day() {
        let late = Utc.with_ymd_and_hms(2024, 3, 1, 23, 59, 59).unwrap();
        let mut entry = LedgerEntry::new("user-a", late);
        entry.apply(90, RewardSource::Spin, late, 100);
        // Bonus from that claim commits just after midnight
        entry.apply(100, RewardSource::AchievementBonus, at(2024, 3, 2, 0), 100);
        assert_eq!(entry.last_streak_day, Some(late.date_naive()));

        entry.apply(10, RewardSource::Spin, at(2024, 3, 2, 12), 100);
        assert_eq!(entry.current_streak, 2);
    }

    #[test]
    fn test_bonus_does_not_touch_activity_counters() {
        let now = at(2024, 3, 1, 9);
        let mut entry = LedgerEntry::new("user-a", now);
        entry.apply(100, RewardSource::AchievementBonus, now, 100);

        assert_eq!(entry.total_points, 100);
        assert_eq!(entry.level, 2);
        assert_eq!(entry.current_streak, 0);
        assert_eq!(entry.sessions_completed, 0);
        assert!(entry.last_daily_claim.is_none());
    }

    #[test]
    fn test_breathing_counts_sessions_and_daily_marks_claim() {
        let now = at(2024, 3, 1, 9);
        let mut entry = LedgerEntry::new("user-a", now);
        entry.apply(5, RewardSource::Breathing, now, 100);
        entry.apply(5, RewardSource::Breathing, now, 100);
        assert_eq!(entry.sessions_completed, 2);

        assert!(!entry.claimed_daily_on(now));
        entry.apply(20, RewardSource::DailyLogin, now, 100);
        assert!(entry.claimed_daily_on(now));
        assert!(!entry.claimed_daily_on(at(2024, 3, 2, 0)));
    }

    #[test]
    fn test_reward_source_serde_names() {
        let json = serde_json::to_string(&RewardSource::DailyLogin).unwrap();
        assert_eq!(json, "\"daily_login\"");
        let parsed: RewardSource = serde_json::from_str("\"breathing\"").unwrap();
        assert_eq!(parsed, RewardSource::Breathing);
        assert!(!RewardSource::AchievementBonus.is_client_claimable());
        assert!(RewardSource::Farming.is_client_claimable());
    }
}
