// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reward-Ledger: points, achievements and leaderboards for a wellness app
//!
//! This crate provides the backend API that records points earned through
//! app activities, grants achievements, and ranks users on a leaderboard.
//! Ledger updates use optimistic concurrency so concurrent claims never lose
//! points or create duplicate ledger rows.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use std::sync::Arc;

use config::Config;
use db::LedgerStore;
use services::{LeaderboardService, PointsService, RewardService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn LedgerStore>,
    pub rewards: RewardService,
    pub leaderboard: LeaderboardService,
}

impl AppState {
    /// Wire the services on top of a store.
    pub fn new(config: Config, store: Arc<dyn LedgerStore>) -> Self {
        let points = PointsService::new(store.clone(), &config);
        let rewards = RewardService::new(points);
        let leaderboard = LeaderboardService::new(store.clone(), config.backend_timeout);

        Self {
            config,
            store,
            rewards,
            leaderboard,
        }
    }
}
