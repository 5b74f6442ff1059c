// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Achievement catalog and grant records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::LedgerEntry;

/// Which ledger statistic an achievement threshold applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementType {
    Level,
    Points,
    Streak,
    Sessions,
}

impl RequirementType {
    pub fn as_str(self) -> &'static str {
        match self {
            RequirementType::Level => "level",
            RequirementType::Points => "points",
            RequirementType::Streak => "streak",
            RequirementType::Sessions => "sessions",
        }
    }
}

/// Achievement definition, seeded by an administrator.
///
/// Stored at: `achievements/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Icon name or emoji shown by the UI
    #[serde(default)]
    pub icon: String,
    pub requirement_type: RequirementType,
    pub requirement_value: u64,
    /// Bonus points granted once, when the achievement is earned
    #[serde(default)]
    pub points_reward: u64,
}

impl AchievementDefinition {
    /// Whether the ledger snapshot meets this definition's threshold.
    pub fn is_met_by(&self, ledger: &LedgerEntry) -> bool {
        let actual = match self.requirement_type {
            RequirementType::Level => u64::from(ledger.level),
            RequirementType::Points => ledger.total_points,
            RequirementType::Streak => u64::from(ledger.current_streak),
            RequirementType::Sessions => u64::from(ledger.sessions_completed),
        };
        actual >= self.requirement_value
    }
}

/// A granted achievement.
///
/// Stored at: `user_achievements/{user_id}_{achievement_id}`, so a second
/// grant of the same pair lands on the same document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAchievement {
    pub user_id: String,
    pub achievement_id: String,
    pub earned_at: DateTime<Utc>,
}

impl UserAchievement {
    /// Document ID for a (user, achievement) pair.
    pub fn doc_id(user_id: &str, achievement_id: &str) -> String {
        format!("{}_{}", user_id, achievement_id)
    }
}
