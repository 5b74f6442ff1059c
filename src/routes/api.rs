// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{AchievementDefinition, LedgerEntry, RewardSource};
use crate::services::guarded;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/ledger", get(get_ledger))
        .route("/api/rewards", post(claim_reward))
        .route("/api/achievements", get(get_achievements))
}

// ─── Ledger ──────────────────────────────────────────────────

/// Ledger response.
#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LedgerResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_points: u64,
    pub level: u32,
    pub rank: String,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub sessions_completed: u32,
    pub last_activity: String,
    pub daily_claimed_today: bool,
}

impl From<&LedgerEntry> for LedgerResponse {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            total_points: entry.total_points,
            level: entry.level,
            rank: entry.rank.clone(),
            current_streak: entry.current_streak,
            longest_streak: entry.longest_streak,
            sessions_completed: entry.sessions_completed,
            last_activity: format_utc_rfc3339(entry.last_activity),
            daily_claimed_today: entry.claimed_daily_on(chrono::Utc::now()),
        }
    }
}

/// Get the current user's ledger.
async fn get_ledger(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<LedgerResponse>> {
    let entry = state
        .rewards
        .points()
        .get_ledger(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No points earned yet".to_string()))?;

    Ok(Json(LedgerResponse::from(&entry)))
}

// ─── Reward Claims ───────────────────────────────────────────

#[derive(Deserialize, Validate, Debug)]
pub struct ClaimRequest {
    pub source: RewardSource,
    /// Points for a single claim are capped at 1000
    #[validate(range(min = 0, max = 1000))]
    pub points: i64,
}

/// Achievement as shown to the user.
#[derive(Serialize, Clone, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AchievementSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub requirement_type: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub requirement_value: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub points_reward: u64,
    pub earned: bool,
}

impl AchievementSummary {
    fn new(def: &AchievementDefinition, earned: bool) -> Self {
        Self {
            id: def.id.clone(),
            name: def.name.clone(),
            description: def.description.clone(),
            icon: def.icon.clone(),
            requirement_type: def.requirement_type.as_str().to_string(),
            requirement_value: def.requirement_value,
            points_reward: def.points_reward,
            earned,
        }
    }
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ClaimResponse {
    pub ledger: LedgerResponse,
    pub new_achievements: Vec<AchievementSummary>,
}

/// Claim points for a completed activity.
async fn claim_reward(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<ClaimRequest>,
) -> Result<Json<ClaimResponse>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    tracing::debug!(
        user_id = %user.user_id,
        source = request.source.as_str(),
        points = request.points,
        "Reward claim"
    );

    let outcome = state
        .rewards
        .claim(&user.user_id, request.source, request.points)
        .await?;

    Ok(Json(ClaimResponse {
        ledger: LedgerResponse::from(&outcome.ledger),
        new_achievements: outcome
            .new_achievements
            .iter()
            .map(|def| AchievementSummary::new(def, true))
            .collect(),
    }))
}

// ─── Achievements ────────────────────────────────────────────

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AchievementsResponse {
    pub achievements: Vec<AchievementSummary>,
    pub earned_count: u32,
}

/// Full catalog with the current user's earned flags.
async fn get_achievements(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<AchievementsResponse>> {
    let timeout = state.config.backend_timeout;
    let catalog = guarded(timeout, state.store.list_achievements()).await?;
    let granted: HashSet<String> =
        guarded(timeout, state.store.list_granted_achievements(&user.user_id))
            .await?
            .into_iter()
            .collect();

    let achievements: Vec<AchievementSummary> = catalog
        .iter()
        .map(|def| AchievementSummary::new(def, granted.contains(&def.id)))
        .collect();
    let earned_count = achievements.iter().filter(|a| a.earned).count() as u32;

    Ok(Json(AchievementsResponse {
        achievements,
        earned_count,
    }))
}
