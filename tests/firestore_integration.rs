// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running and
//! FIRESTORE_EMULATOR_HOST to be set. Each test uses unique participant
//! names so runs against a shared emulator do not interfere.

use chrono::{TimeZone, Utc};
use slide_rally::db::{ScanStore, StorageError};
use slide_rally::models::{ScanOutcome, ScanRecord};
use slide_rally::services::{RankingEngine, ScanLedger};
use std::sync::Arc;

mod common;
use common::{test_firestore, unique_name};

#[tokio::test]
async fn test_user_creation_is_idempotent() {
    require_emulator!();

    let store = test_firestore().await;
    let name = unique_name("create");

    assert!(store.find_user(&name).await.unwrap().is_none());

    let created_at = Utc.with_ymd_and_hms(2025, 5, 1, 10, 0, 0).unwrap();
    let first = store.create_user(&name, created_at).await.unwrap();
    let second = store
        .create_user(&name, created_at + chrono::Duration::hours(1))
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(store.find_user(&name).await.unwrap(), Some(first));
}

#[tokio::test]
async fn test_duplicate_scan_insert_rejected() {
    require_emulator!();

    let store = test_firestore().await;
    let name = unique_name("dup");
    store.create_user(&name, Utc::now()).await.unwrap();

    let scan = ScanRecord {
        user_name: name.clone(),
        slide_id: "slide1".to_string(),
        scanned_at: Utc::now(),
    };
    store.insert_scan(&scan).await.unwrap();

    let err = store.insert_scan(&scan).await.unwrap_err();
    assert!(matches!(err, StorageError::Duplicate));
    assert!(store.scan_exists(&name, "slide1").await.unwrap());
    assert_eq!(store.count_scans_for_user(&name).await.unwrap(), 1);
}

#[tokio::test]
async fn test_scan_for_missing_user_is_not_kept() {
    require_emulator!();

    let store = test_firestore().await;
    let name = unique_name("gone");

    let scan = ScanRecord {
        user_name: name.clone(),
        slide_id: "slide1".to_string(),
        scanned_at: Utc::now(),
    };
    let err = store.insert_scan(&scan).await.unwrap_err();

    assert!(matches!(err, StorageError::UserMissing(ref missing) if *missing == name));
    assert!(!store.scan_exists(&name, "slide1").await.unwrap());

    // Re-registering the name starts from zero scans
    store.create_user(&name, Utc::now()).await.unwrap();
    assert_eq!(store.count_scans_for_user(&name).await.unwrap(), 0);
}

#[tokio::test]
async fn test_reserved_and_long_identifiers_accepted() {
    require_emulator!();

    let store: Arc<dyn ScanStore> = Arc::new(test_firestore().await);
    let ledger = ScanLedger::new(store.clone());
    let name = format!("__{}", unique_name("x"));
    let long_name = format!("{}{}", unique_name("é"), "é".repeat(60));

    assert_eq!(
        ledger.record_scan(&name, "y__").await.unwrap(),
        ScanOutcome::Recorded { total_scans: 1 }
    );
    assert_eq!(
        ledger.record_scan(&long_name, &"😀".repeat(100)).await.unwrap(),
        ScanOutcome::Recorded { total_scans: 1 }
    );
    assert_eq!(
        ledger.record_scan(&long_name, &"😀".repeat(100)).await.unwrap(),
        ScanOutcome::AlreadyScanned { total_scans: 1 }
    );
}

#[tokio::test]
async fn test_concurrent_scans_record_once() {
    require_emulator!();

    let store: Arc<dyn ScanStore> = Arc::new(test_firestore().await);
    let ledger = ScanLedger::new(store.clone());
    let name = unique_name("race");

    let mut handles = vec![];
    for _ in 0..10 {
        let ledger = ledger.clone();
        let name = name.clone();
        handles.push(tokio::spawn(async move {
            ledger.record_scan(&name, "slide2").await
        }));
    }

    let mut recorded = 0;
    for handle in handles {
        let outcome = handle.await.expect("Task join failed").expect("Scan failed");
        if outcome.is_recorded() {
            recorded += 1;
        }
        assert_eq!(outcome.total_scans(), 1);
    }

    assert_eq!(recorded, 1);
    assert_eq!(store.count_scans_for_user(&name).await.unwrap(), 1);
}

#[tokio::test]
async fn test_ledger_round_trip_and_removal() {
    require_emulator!();

    let store: Arc<dyn ScanStore> = Arc::new(test_firestore().await);
    let ledger = ScanLedger::new(store.clone());
    let ranking = RankingEngine::new(store.clone());
    let name = unique_name("Ana Luz");

    assert_eq!(
        ledger.record_scan(&name, "slide1").await.unwrap(),
        ScanOutcome::Recorded { total_scans: 1 }
    );
    assert_eq!(
        ledger.record_scan(&name, "slide/2").await.unwrap(),
        ScanOutcome::Recorded { total_scans: 2 }
    );

    let entries = ranking.get_ranking().await.unwrap();
    let entry = entries.iter().find(|e| e.user == name).unwrap();
    assert_eq!(entry.scan_count, 2);

    ledger.remove_user(&name).await.unwrap();
    assert!(store.find_user(&name).await.unwrap().is_none());
    assert_eq!(store.count_scans_for_user(&name).await.unwrap(), 0);

    // Second removal is a no-op
    ledger.remove_user(&name).await.unwrap();
}
