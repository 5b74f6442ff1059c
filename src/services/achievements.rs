// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Achievement eligibility scanning.
//!
//! After a ledger update, compares the new stats against the catalog and
//! grants every achievement the user now qualifies for. Bonus points from a
//! grant go through the regular points workflow, and since a bonus can push
//! the user over another threshold, the scan repeats until nothing new
//! qualifies.

use std::collections::HashSet;

use crate::error::Result;
use crate::models::{AchievementDefinition, LedgerEntry, RewardSource};
use crate::services::{guarded, PointsService};

/// Definitions met by `ledger` that are not in `granted`.
///
/// Ordered by ascending requirement value; ties keep catalog order.
pub fn newly_eligible<'a>(
    ledger: &LedgerEntry,
    catalog: &'a [AchievementDefinition],
    granted: &HashSet<String>,
) -> Vec<&'a AchievementDefinition> {
    let mut eligible: Vec<&AchievementDefinition> = catalog
        .iter()
        .filter(|def| !granted.contains(&def.id) && def.is_met_by(ledger))
        .collect();
    // Stable sort keeps catalog order for equal thresholds.
    eligible.sort_by_key(|def| def.requirement_value);
    eligible
}

/// Result of a scan.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// Achievements granted by this scan, in grant order
    pub granted: Vec<AchievementDefinition>,
    /// Ledger after all bonuses were applied
    pub ledger: LedgerEntry,
}

/// Grants newly earned achievements.
#[derive(Clone)]
pub struct AchievementScanner {
    points: PointsService,
}

impl AchievementScanner {
    pub fn new(points: PointsService) -> Self {
        Self { points }
    }

    /// Scan `ledger` against the catalog and grant what qualifies.
    ///
    /// Reading the catalog or the granted set can fail the scan. A failed
    /// grant or bonus for one achievement is logged and skipped.
    pub async fn scan(&self, ledger: LedgerEntry) -> Result<ScanOutcome> {
        let store = self.points.store();
        let timeout = self.points.timeout();
        let user_id = ledger.user_id.clone();

        let catalog = guarded(timeout, store.list_achievements()).await?;
        let mut granted: HashSet<String> =
            guarded(timeout, store.list_granted_achievements(&user_id))
                .await?
                .into_iter()
                .collect();

        let mut outcome = ScanOutcome {
            granted: Vec::new(),
            ledger,
        };

        // Each pass either grants something new or stops, so the catalog
        // size bounds the number of passes.
        for _ in 0..=catalog.len() {
            let eligible: Vec<AchievementDefinition> =
                newly_eligible(&outcome.ledger, &catalog, &granted)
                    .into_iter()
                    .cloned()
                    .collect();
            if eligible.is_empty() {
                break;
            }

            for def in eligible {
                // Skip it for the rest of this scan whatever the result.
                granted.insert(def.id.clone());

                let created =
                    match guarded(timeout, store.grant_achievement(&user_id, &def.id)).await {
                        Ok(created) => created,
                        Err(e) => {
                            tracing::warn!(
                                user_id = %user_id,
                                achievement_id = %def.id,
                                error = %e,
                                "Failed to grant achievement, skipping"
                            );
                            continue;
                        }
                    };

                if !created {
                    tracing::debug!(
                        user_id = %user_id,
                        achievement_id = %def.id,
                        "Achievement already granted (idempotent skip)"
                    );
                    continue;
                }

                tracing::info!(
                    user_id = %user_id,
                    achievement_id = %def.id,
                    points_reward = def.points_reward,
                    "Achievement granted"
                );

                if def.points_reward > 0 {
                    let bonus = i64::try_from(def.points_reward).unwrap_or(i64::MAX);
                    match self
                        .points
                        .apply_points(&user_id, bonus, RewardSource::AchievementBonus)
                        .await
                    {
                        Ok(updated) => outcome.ledger = updated,
                        Err(e) => {
                            tracing::warn!(
                                user_id = %user_id,
                                achievement_id = %def.id,
                                error = %e,
                                "Failed to apply achievement bonus"
                            );
                        }
                    }
                }

                outcome.granted.push(def);
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RequirementType;

    fn def(id: &str, requirement_type: RequirementType, value: u64) -> AchievementDefinition {
        AchievementDefinition {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            icon: String::new(),
            requirement_type,
            requirement_value: value,
            points_reward: 0,
        }
    }

    fn ledger_with(points: u64) -> LedgerEntry {
        let now = chrono::Utc::now();
        let mut entry = LedgerEntry::new("u1", now);
        entry.apply(points, RewardSource::Spin, now, 100);
        entry
    }

    #[test]
    fn test_orders_by_value_then_catalog() {
        let catalog = vec![
            def("points_150", RequirementType::Points, 150),
            def("level_2", RequirementType::Level, 2),
            def("streak_1", RequirementType::Streak, 1),
            def("sessions_1", RequirementType::Sessions, 1),
            def("points_1", RequirementType::Points, 1),
        ];
        let ledger = ledger_with(150);

        let ids: Vec<&str> = newly_eligible(&ledger, &catalog, &HashSet::new())
            .into_iter()
            .map(|d| d.id.as_str())
            .collect();

        // sessions_1 is not met (spin is not a session).
        assert_eq!(ids, vec!["streak_1", "points_1", "level_2", "points_150"]);
    }

    #[test]
    fn test_skips_granted() {
        let catalog = vec![
            def("points_10", RequirementType::Points, 10),
            def("points_20", RequirementType::Points, 20),
        ];
        let granted: HashSet<String> = ["points_10".to_string()].into_iter().collect();

        let eligible = newly_eligible(&ledger_with(50), &catalog, &granted);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, "points_20");
    }

    #[test]
    fn test_nothing_met() {
        let catalog = vec![def("level_5", RequirementType::Level, 5)];
        assert!(newly_eligible(&ledger_with(120), &catalog, &HashSet::new()).is_empty());
    }
}
