//! Ranking engine.
//!
//! Stateless: every call reads the current ledger snapshot and sorts it.
//! Nothing is cached between calls.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::db::ScanStore;
use crate::error::Result;
use crate::models::{RankedEntry, RankingEntry, UserScanStats};

/// Read-only view over the scan store that produces the leaderboard.
#[derive(Clone)]
pub struct RankingEngine {
    store: Arc<dyn ScanStore>,
}

impl RankingEngine {
    pub fn new(store: Arc<dyn ScanStore>) -> Self {
        Self { store }
    }

    /// Current leaderboard, leader first. Empty when nobody has scanned.
    pub async fn get_ranking(&self) -> Result<Vec<RankingEntry>> {
        let stats = self.store.list_users_with_scan_stats().await?;
        let ranking = rank(stats);
        tracing::debug!(entries = ranking.len(), "Ranking computed");
        Ok(ranking)
    }
}

/// Leaderboard order: more scans first, then whoever reached their count
/// earliest.
fn compare_entries(a: &RankingEntry, b: &RankingEntry) -> Ordering {
    b.scan_count
        .cmp(&a.scan_count)
        .then_with(|| a.last_scan_at.cmp(&b.last_scan_at))
}

/// Sort aggregates into a leaderboard.
///
/// Participants without scans are left out. The sort is stable, so entries
/// equal in count and timestamp keep the order they were given in.
pub fn rank(stats: Vec<UserScanStats>) -> Vec<RankingEntry> {
    let mut entries: Vec<RankingEntry> = stats
        .into_iter()
        .filter_map(|s| {
            let last_scan_at = s.last_scan_at.filter(|_| s.scan_count > 0)?;
            Some(RankingEntry {
                user: s.name,
                scan_count: s.scan_count,
                last_scan_at,
            })
        })
        .collect();

    entries.sort_by(compare_entries);
    entries
}

/// Attach 1-based positions by sorted index.
pub fn assign_positions(entries: Vec<RankingEntry>) -> Vec<RankedEntry> {
    entries
        .into_iter()
        .zip(1u32..)
        .map(|(entry, position)| RankedEntry { position, entry })
        .collect()
}
