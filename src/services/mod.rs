// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod ledger;
pub mod ranking;

pub use ledger::ScanLedger;
pub use ranking::RankingEngine;
