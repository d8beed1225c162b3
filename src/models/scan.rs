// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Scan records and the outcome of recording one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::User;

/// One successful scan of a slide's QR code.
///
/// At most one record exists per `(user_name, slide_id)` pair. Records are
/// immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Participant display name
    pub user_name: String,
    /// Opaque slide identifier (e.g. "slide3")
    pub slide_id: String,
    /// When the scan was accepted
    pub scanned_at: DateTime<Utc>,
}

/// Result of a `record_scan` call that did not fail.
///
/// A duplicate scan is an expected outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The scan was new and has been stored.
    Recorded { total_scans: u32 },
    /// The participant had already scanned this slide; nothing changed.
    AlreadyScanned { total_scans: u32 },
}

impl ScanOutcome {
    pub fn total_scans(&self) -> u32 {
        match self {
            ScanOutcome::Recorded { total_scans } | ScanOutcome::AlreadyScanned { total_scans } => {
                *total_scans
            }
        }
    }

    pub fn is_recorded(&self) -> bool {
        matches!(self, ScanOutcome::Recorded { .. })
    }
}

/// Detailed result of recording a scan.
///
/// Carries the outcome plus whether this call implicitly registered the
/// participant (first scan from an unseen name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReceipt {
    pub outcome: ScanOutcome,
    pub user_created: bool,
}

/// All scans of one participant, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanHistory {
    pub user: User,
    pub scans: Vec<ScanRecord>,
}
