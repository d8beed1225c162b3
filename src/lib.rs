// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Slide Rally: QR-code scan ledger and live ranking for events
//!
//! Attendees scan one QR code per slide; each (attendee, slide) pair counts
//! once. This crate provides the scan ledger, the ranking engine and the
//! HTTP API the event pages call.

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
use db::ScanStore;
use services::{RankingEngine, ScanLedger};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub ledger: ScanLedger,
    pub ranking: RankingEngine,
}

impl AppState {
    /// Build the ledger and ranking engine over one shared store.
    pub fn new(config: Config, store: Arc<dyn ScanStore>) -> Self {
        Self {
            config,
            ledger: ScanLedger::new(store.clone()),
            ranking: RankingEngine::new(store),
        }
    }
}
