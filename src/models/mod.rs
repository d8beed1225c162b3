// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod ranking;
pub mod scan;
pub mod user;

pub use ranking::{RankedEntry, RankingEntry, UserScanStats};
pub use scan::{ScanHistory, ScanOutcome, ScanReceipt, ScanRecord};
pub use user::User;
