// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Leaderboard routes: one-shot listing and a live server-sent events stream.

use crate::error::{AppError, Result};
use crate::services::leaderboard::{LeaderboardRow, DEFAULT_LEADERBOARD_LIMIT};
use crate::services::LeaderboardService;
use crate::AppState;
use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/leaderboard", get(get_leaderboard))
        .route("/api/leaderboard/stream", get(stream_leaderboard))
}

#[derive(Deserialize, Validate, Debug)]
pub struct LeaderboardQuery {
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_LEADERBOARD_LIMIT
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LeaderboardEntryResponse {
    pub position: u32,
    pub display_name: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_points: u64,
    pub level: u32,
    pub current_streak: u32,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LeaderboardResponse {
    pub entries: Vec<LeaderboardEntryResponse>,
}

impl From<Vec<LeaderboardRow>> for LeaderboardResponse {
    fn from(rows: Vec<LeaderboardRow>) -> Self {
        Self {
            entries: rows
                .into_iter()
                .map(|row| LeaderboardEntryResponse {
                    position: row.position,
                    display_name: row.display_name,
                    total_points: row.total_points,
                    level: row.level,
                    current_streak: row.current_streak,
                })
                .collect(),
        }
    }
}

/// Current leaderboard.
async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>> {
    params
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let rows = state.leaderboard.top(params.limit).await?;
    Ok(Json(LeaderboardResponse::from(rows)))
}

/// Live leaderboard.
///
/// Sends the current leaderboard immediately, then a fresh one after each
/// ledger change. Changes that arrive while a refresh is computed are folded
/// into the next refresh.
async fn stream_leaderboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeaderboardQuery>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    params
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let rx = state.store.feed().subscribe();
    let service = state.leaderboard.clone();
    let limit = params.limit;

    tracing::debug!(limit, "Leaderboard stream opened");

    let events = stream::unfold(
        (service, rx, true),
        move |(service, mut rx, first)| async move {
            if !first && !wait_for_change(&mut rx).await {
                return None;
            }
            let event = leaderboard_event(&service, limit).await;
            Some((Ok(event), (service, rx, false)))
        },
    );

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// Block until at least one change arrives, then drain any backlog.
/// Returns `false` once the feed is closed.
async fn wait_for_change<T: Clone>(rx: &mut broadcast::Receiver<T>) -> bool {
    match rx.recv().await {
        Ok(_) | Err(RecvError::Lagged(_)) => {}
        Err(RecvError::Closed) => return false,
    }
    loop {
        match rx.try_recv() {
            Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty) => return true,
            Err(TryRecvError::Closed) => return false,
        }
    }
}

async fn leaderboard_event(service: &LeaderboardService, limit: usize) -> Event {
    match service.top(limit).await {
        Ok(rows) => Event::default()
            .event("leaderboard")
            .json_data(LeaderboardResponse::from(rows))
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "Failed to encode leaderboard event");
                Event::default().event("error").data("encoding_failed")
            }),
        Err(e) => {
            tracing::warn!(error = %e, "Leaderboard refresh failed");
            Event::default().event("error").data("refresh_failed")
        }
    }
}
