// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod achievements;
pub mod catalog;
pub mod leaderboard;
pub mod points;
pub mod rewards;

pub use achievements::AchievementScanner;
pub use catalog::AchievementCatalog;
pub use leaderboard::{LeaderboardRow, LeaderboardService};
pub use points::PointsService;
pub use rewards::{ClaimOutcome, RewardService};

use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, Result};

/// Run a backend call with a deadline. Expiry maps to `UpstreamUnavailable`.
pub async fn guarded<T, F>(timeout: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(AppError::UpstreamUnavailable(format!(
            "Backend call timed out after {} ms",
            timeout.as_millis()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_guarded_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, AppError>(1)
        };

        let err = guarded(Duration::from_millis(20), slow).await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn test_guarded_passes_through() {
        let value = guarded(Duration::from_secs(1), async { Ok::<_, AppError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);

        let err = guarded(Duration::from_secs(1), async {
            Err::<u8, _>(AppError::NotFound("x".to_string()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
