// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reward claim workflow.
//!
//! Handles a user action that earns points:
//! 1. Apply the points through the versioned ledger update
//! 2. Scan for newly earned achievements and apply their bonuses
//!
//! The leaderboard stream picks up the resulting ledger changes on its own.

use crate::error::{AppError, Result};
use crate::models::{AchievementDefinition, LedgerEntry, RewardSource};
use crate::services::{AchievementScanner, PointsService};

/// Result of a claim.
#[derive(Debug, Clone)]
pub struct ClaimOutcome {
    /// Ledger after the claim and any achievement bonuses
    pub ledger: LedgerEntry,
    pub new_achievements: Vec<AchievementDefinition>,
}

/// Points plus achievements, as one operation.
#[derive(Clone)]
pub struct RewardService {
    points: PointsService,
    scanner: AchievementScanner,
}

impl RewardService {
    pub fn new(points: PointsService) -> Self {
        let scanner = AchievementScanner::new(points.clone());
        Self { points, scanner }
    }

    pub fn points(&self) -> &PointsService {
        &self.points
    }

    /// Claim `points` from `source` for `user_id`.
    ///
    /// Once the points are stored the claim has succeeded: a failing
    /// achievement scan is logged and reported as "no new achievements".
    pub async fn claim(&self, user_id: &str, source: RewardSource, points: i64) -> Result<ClaimOutcome> {
        if !source.is_client_claimable() {
            return Err(AppError::Validation(format!(
                "Reward source {} cannot be claimed directly",
                source.as_str()
            )));
        }

        let ledger = self.points.apply_points(user_id, points, source).await?;

        match self.scanner.scan(ledger.clone()).await {
            Ok(scan) => Ok(ClaimOutcome {
                ledger: scan.ledger,
                new_achievements: scan.granted,
            }),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Achievement scan failed after claim");
                Ok(ClaimOutcome {
                    ledger,
                    new_achievements: Vec::new(),
                })
            }
        }
    }
}
