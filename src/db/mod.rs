//! Storage layer.
//!
//! The ledger is written against [`ScanStore`]; a process picks one backend
//! at startup:
//! - [`MemoryStore`]: in-process map, lost on restart
//! - [`FirestoreStore`]: Google Cloud Firestore

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{ScanRecord, User, UserScanStats};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Scan records keyed by `{user}_{slide}` (see `scan_document_id`)
    pub const SCANS: &str = "scans";
}

/// Storage-level failures.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A scan for the same (user, slide) pair already exists.
    #[error("Scan already recorded")]
    Duplicate,

    /// The participant disappeared between lookup and write.
    #[error("User not found: {0}")]
    UserMissing(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Storage interface used by the scan ledger.
///
/// Participants are keyed by display name. Implementations must make
/// `insert_scan` atomic per key: of two concurrent inserts for the same
/// (user, slide) pair, exactly one succeeds and the other returns
/// [`StorageError::Duplicate`].
#[async_trait]
pub trait ScanStore: Send + Sync {
    /// Look up a participant by name.
    async fn find_user(&self, name: &str) -> StorageResult<Option<User>>;

    /// Create a participant, or return the stored one if it already exists.
    async fn create_user(&self, name: &str, created_at: DateTime<Utc>) -> StorageResult<User>;

    async fn scan_exists(&self, user_name: &str, slide_id: &str) -> StorageResult<bool>;

    /// Insert a scan record, failing with `Duplicate` if the key is taken.
    async fn insert_scan(&self, scan: &ScanRecord) -> StorageResult<()>;

    async fn count_scans_for_user(&self, user_name: &str) -> StorageResult<u32>;

    /// Every participant with scan totals, in registration order.
    async fn list_users_with_scan_stats(&self) -> StorageResult<Vec<UserScanStats>>;

    /// Every participant, in registration order.
    async fn list_users(&self) -> StorageResult<Vec<User>>;

    /// Every scan record, oldest first.
    async fn list_scans(&self) -> StorageResult<Vec<ScanRecord>>;

    /// Delete a participant and their scans. Missing participants are a no-op.
    async fn delete_user(&self, name: &str) -> StorageResult<()>;

    /// Delete every participant and scan.
    async fn delete_all_users(&self) -> StorageResult<()>;
}

/// Sort participants into registration order.
///
/// Ties on `created_at` fall back to name so the order is total.
pub(crate) fn sort_by_registration(users: &mut [User]) {
    users.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.name.cmp(&b.name))
    });
}

/// Build per-participant aggregates from users (already in registration
/// order) and an unordered scan list.
pub(crate) fn aggregate_scan_stats(users: &[User], scans: &[ScanRecord]) -> Vec<UserScanStats> {
    let mut by_name: std::collections::HashMap<&str, UserScanStats> = users
        .iter()
        .map(|u| (u.name.as_str(), UserScanStats::for_user(u)))
        .collect();

    for scan in scans {
        if let Some(stats) = by_name.get_mut(scan.user_name.as_str()) {
            stats.add_scan(scan);
        }
    }

    users
        .iter()
        .filter_map(|u| by_name.remove(u.name.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_aggregate_keeps_user_order_and_skips_orphans() {
        let users = vec![User::new("Zed", at(1)), User::new("Amy", at(2))];
        let scans = vec![
            ScanRecord {
                user_name: "Amy".to_string(),
                slide_id: "slide1".to_string(),
                scanned_at: at(10),
            },
            ScanRecord {
                user_name: "Ghost".to_string(),
                slide_id: "slide1".to_string(),
                scanned_at: at(11),
            },
        ];

        let stats = aggregate_scan_stats(&users, &scans);

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].name, "Zed");
        assert_eq!(stats[0].scan_count, 0);
        assert_eq!(stats[1].name, "Amy");
        assert_eq!(stats[1].scan_count, 1);
        assert_eq!(stats[1].last_scan_at, Some(at(10)));
    }

    #[test]
    fn test_sort_by_registration_breaks_ties_by_name() {
        let mut users = vec![
            User::new("b", at(5)),
            User::new("a", at(5)),
            User::new("c", at(1)),
        ];
        sort_by_registration(&mut users);

        let names: Vec<_> = users.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }
}
