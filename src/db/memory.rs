// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process storage backend.
//!
//! Each participant owns one `DashMap` entry holding their scans. Holding the
//! entry's write guard makes the duplicate check and the insert a single
//! atomic step for that participant.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::db::{ScanStore, StorageError, StorageResult};
use crate::models::{ScanRecord, User, UserScanStats};

struct UserSlot {
    user: User,
    /// Registration sequence number, for stable ordering
    seq: u64,
    /// (slide_id, scanned_at) in insertion order
    scans: Vec<(String, DateTime<Utc>)>,
}

impl UserSlot {
    fn stats(&self) -> UserScanStats {
        UserScanStats {
            name: self.user.name.clone(),
            created_at: self.user.created_at,
            scan_count: self.scans.len() as u32,
            last_scan_at: self.scans.iter().map(|(_, at)| *at).max(),
        }
    }
}

/// Storage backed by a concurrent in-memory map.
///
/// Constructed once per process and shared through `Arc<dyn ScanStore>`.
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<String, UserSlot>,
    next_seq: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all slots sorted by registration, mapped through `f`.
    fn collect_ordered<T>(&self, f: impl Fn(&UserSlot) -> T) -> Vec<T> {
        let mut rows: Vec<(u64, T)> = self
            .users
            .iter()
            .map(|entry| (entry.seq, f(entry.value())))
            .collect();
        rows.sort_by_key(|(seq, _)| *seq);
        rows.into_iter().map(|(_, row)| row).collect()
    }
}

#[async_trait]
impl ScanStore for MemoryStore {
    async fn find_user(&self, name: &str) -> StorageResult<Option<User>> {
        Ok(self.users.get(name).map(|slot| slot.user.clone()))
    }

    async fn create_user(&self, name: &str, created_at: DateTime<Utc>) -> StorageResult<User> {
        let slot = self
            .users
            .entry(name.to_string())
            .or_insert_with(|| UserSlot {
                user: User::new(name, created_at),
                seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                scans: Vec::new(),
            });
        Ok(slot.user.clone())
    }

    async fn scan_exists(&self, user_name: &str, slide_id: &str) -> StorageResult<bool> {
        Ok(self
            .users
            .get(user_name)
            .is_some_and(|slot| slot.scans.iter().any(|(slide, _)| slide == slide_id)))
    }

    async fn insert_scan(&self, scan: &ScanRecord) -> StorageResult<()> {
        // The write guard is held across the check and the push.
        let mut slot = self
            .users
            .get_mut(&scan.user_name)
            .ok_or_else(|| StorageError::UserMissing(scan.user_name.clone()))?;

        if slot.scans.iter().any(|(slide, _)| *slide == scan.slide_id) {
            return Err(StorageError::Duplicate);
        }

        slot.scans.push((scan.slide_id.clone(), scan.scanned_at));
        Ok(())
    }

    async fn count_scans_for_user(&self, user_name: &str) -> StorageResult<u32> {
        Ok(self
            .users
            .get(user_name)
            .map_or(0, |slot| slot.scans.len() as u32))
    }

    async fn list_users_with_scan_stats(&self) -> StorageResult<Vec<UserScanStats>> {
        Ok(self.collect_ordered(UserSlot::stats))
    }

    async fn list_users(&self) -> StorageResult<Vec<User>> {
        Ok(self.collect_ordered(|slot| slot.user.clone()))
    }

    async fn list_scans(&self) -> StorageResult<Vec<ScanRecord>> {
        let mut scans: Vec<ScanRecord> = self
            .collect_ordered(|slot| {
                slot.scans
                    .iter()
                    .map(|(slide, at)| ScanRecord {
                        user_name: slot.user.name.clone(),
                        slide_id: slide.clone(),
                        scanned_at: *at,
                    })
                    .collect::<Vec<_>>()
            })
            .into_iter()
            .flatten()
            .collect();
        // Stable: equal timestamps keep registration order.
        scans.sort_by_key(|scan| scan.scanned_at);
        Ok(scans)
    }

    async fn delete_user(&self, name: &str) -> StorageResult<()> {
        if self.users.remove(name).is_some() {
            tracing::debug!(user = name, "Removed user from memory store");
        }
        Ok(())
    }

    async fn delete_all_users(&self) -> StorageResult<()> {
        let count = self.users.len();
        self.users.clear();
        tracing::debug!(count, "Cleared memory store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn scan(user: &str, slide: &str, secs: i64) -> ScanRecord {
        ScanRecord {
            user_name: user.to_string(),
            slide_id: slide.to_string(),
            scanned_at: at(secs),
        }
    }

    #[tokio::test]
    async fn test_create_user_returns_existing() {
        let store = MemoryStore::new();

        let first = store.create_user("Alice", at(10)).await.unwrap();
        let second = store.create_user("Alice", at(20)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second.created_at, at(10));
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_insert_scan_rejects_duplicate_key() {
        let store = MemoryStore::new();
        store.create_user("Alice", at(0)).await.unwrap();

        store.insert_scan(&scan("Alice", "slide1", 1)).await.unwrap();
        let err = store
            .insert_scan(&scan("Alice", "slide1", 2))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Duplicate));
        assert_eq!(store.count_scans_for_user("Alice").await.unwrap(), 1);
        assert!(store.scan_exists("Alice", "slide1").await.unwrap());
        assert!(!store.scan_exists("Alice", "slide2").await.unwrap());
    }

    #[tokio::test]
    async fn test_insert_scan_for_unknown_user_fails() {
        let store = MemoryStore::new();

        let err = store
            .insert_scan(&scan("Nobody", "slide1", 1))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::UserMissing(name) if name == "Nobody"));
    }

    #[tokio::test]
    async fn test_listing_follows_registration_order() {
        let store = MemoryStore::new();
        // Same timestamp: order must come from registration, not name.
        store.create_user("Zoe", at(5)).await.unwrap();
        store.create_user("Adam", at(5)).await.unwrap();
        store.insert_scan(&scan("Adam", "slide1", 7)).await.unwrap();
        store.insert_scan(&scan("Zoe", "slide1", 7)).await.unwrap();
        store.insert_scan(&scan("Adam", "slide2", 6)).await.unwrap();

        let stats = store.list_users_with_scan_stats().await.unwrap();
        assert_eq!(stats[0].name, "Zoe");
        assert_eq!(stats[1].name, "Adam");
        assert_eq!(stats[1].scan_count, 2);
        assert_eq!(stats[1].last_scan_at, Some(at(7)));

        let scans = store.list_scans().await.unwrap();
        let keys: Vec<_> = scans
            .iter()
            .map(|s| (s.user_name.as_str(), s.slide_id.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![("Adam", "slide2"), ("Zoe", "slide1"), ("Adam", "slide1")]
        );
    }

    #[tokio::test]
    async fn test_delete_user_and_clear() {
        let store = MemoryStore::new();
        store.create_user("Alice", at(0)).await.unwrap();
        store.create_user("Bob", at(1)).await.unwrap();
        store.insert_scan(&scan("Alice", "slide1", 2)).await.unwrap();

        store.delete_user("Alice").await.unwrap();
        store.delete_user("Alice").await.unwrap();
        assert!(store.find_user("Alice").await.unwrap().is_none());
        assert_eq!(store.count_scans_for_user("Alice").await.unwrap(), 0);

        store.delete_all_users().await.unwrap();
        assert!(store.list_users().await.unwrap().is_empty());
    }
}
