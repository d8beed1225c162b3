//! Per-participant scan aggregates and leaderboard entries.
//!
//! Aggregates are computed from scan records on every read; nothing here is
//! persisted.

use chrono::{DateTime, Utc};

use crate::models::{ScanRecord, User};

/// Scan totals for one participant, as read from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserScanStats {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub scan_count: u32,
    /// Most recent scan, `None` if the participant has not scanned yet
    pub last_scan_at: Option<DateTime<Utc>>,
}

impl UserScanStats {
    /// Empty aggregate for a freshly registered participant.
    pub fn for_user(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            created_at: user.created_at,
            scan_count: 0,
            last_scan_at: None,
        }
    }

    /// Fold one scan into the aggregate.
    ///
    /// Scans belonging to another participant are ignored and return `false`.
    pub fn add_scan(&mut self, scan: &ScanRecord) -> bool {
        if scan.user_name != self.name {
            return false;
        }

        self.scan_count += 1;
        self.last_scan_at = Some(match self.last_scan_at {
            Some(last) if last >= scan.scanned_at => last,
            _ => scan.scanned_at,
        });
        true
    }
}

/// One row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingEntry {
    pub user: String,
    pub scan_count: u32,
    pub last_scan_at: DateTime<Utc>,
}

/// Leaderboard row with its 1-based display position.
///
/// Positions follow the sorted index, so tied participants still get
/// distinct positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedEntry {
    pub position: u32,
    pub entry: RankingEntry,
}
