// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod achievement;
pub mod ledger;
pub mod user;

pub use achievement::{AchievementDefinition, RequirementType, UserAchievement};
pub use ledger::{level_for, LedgerEntry, RankTier, RewardSource, DEFAULT_LEVEL_DIVISOR};
pub use user::UserProfile;
