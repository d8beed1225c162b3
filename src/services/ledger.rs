// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scan ledger.
//!
//! The only writer of participants and scans. Recording a scan:
//! 1. Validate and trim the participant name and slide ID
//! 2. Look up the participant, registering them on their first scan
//! 3. Skip if the (participant, slide) pair is already recorded
//! 4. Insert the scan; a concurrent duplicate insert is reported as
//!    `AlreadyScanned`, never as an error

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::db::{ScanStore, StorageError};
use crate::error::{AppError, Result};
use crate::models::{ScanHistory, ScanOutcome, ScanReceipt, ScanRecord, User};

/// Longest accepted participant name or slide ID, in characters.
pub const MAX_IDENTIFIER_LEN: usize = 100;

/// Trim an identifier and reject it if empty or too long.
fn normalize_identifier(field: &str, raw: &str) -> Result<String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{} must not be empty", field)));
    }
    if value.chars().count() > MAX_IDENTIFIER_LEN {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            field, MAX_IDENTIFIER_LEN
        )));
    }
    Ok(value.to_string())
}

/// Append-only record of who scanned which slide.
#[derive(Clone)]
pub struct ScanLedger {
    store: Arc<dyn ScanStore>,
}

impl ScanLedger {
    pub fn new(store: Arc<dyn ScanStore>) -> Self {
        Self { store }
    }

    /// Record that `user_name` scanned `slide_id` now.
    pub async fn record_scan(&self, user_name: &str, slide_id: &str) -> Result<ScanOutcome> {
        let receipt = self
            .record_scan_with_receipt(user_name, slide_id, Utc::now())
            .await?;
        Ok(receipt.outcome)
    }

    /// Record a scan captured while the client was offline.
    ///
    /// Timestamps later than the server clock are clamped to now.
    pub async fn record_scan_at(
        &self,
        user_name: &str,
        slide_id: &str,
        scanned_at: DateTime<Utc>,
    ) -> Result<ScanOutcome> {
        let receipt = self
            .record_scan_with_receipt(user_name, slide_id, scanned_at.min(Utc::now()))
            .await?;
        Ok(receipt.outcome)
    }

    /// Record a scan and report whether the participant was registered by it.
    ///
    /// `user_created` is true when the participant did not exist at lookup
    /// time and this call issued the registration.
    pub async fn record_scan_with_receipt(
        &self,
        user_name: &str,
        slide_id: &str,
        scanned_at: DateTime<Utc>,
    ) -> Result<ScanReceipt> {
        let user_name = normalize_identifier("userName", user_name)?;
        let slide_id = normalize_identifier("slideId", slide_id)?;

        let (user, user_created) = self.upsert_user(&user_name, Utc::now()).await?;

        if self.store.scan_exists(&user.name, &slide_id).await? {
            let total_scans = self.store.count_scans_for_user(&user.name).await?;
            tracing::debug!(
                user = %user.name,
                slide = %slide_id,
                total_scans,
                "Slide already scanned"
            );
            return Ok(ScanReceipt {
                outcome: ScanOutcome::AlreadyScanned { total_scans },
                user_created,
            });
        }

        let record = ScanRecord {
            user_name: user.name.clone(),
            slide_id,
            scanned_at,
        };

        let recorded = match self.store.insert_scan(&record).await {
            Ok(()) => true,
            // Lost the race against a concurrent identical scan.
            Err(StorageError::Duplicate) => false,
            Err(e) => {
                tracing::warn!(
                    user = %record.user_name,
                    slide = %record.slide_id,
                    error = %e,
                    "Scan insert failed"
                );
                return Err(e.into());
            }
        };

        let total_scans = self.store.count_scans_for_user(&record.user_name).await?;

        let outcome = if recorded {
            tracing::info!(
                user = %record.user_name,
                slide = %record.slide_id,
                total_scans,
                "Scan recorded"
            );
            ScanOutcome::Recorded { total_scans }
        } else {
            tracing::debug!(
                user = %record.user_name,
                slide = %record.slide_id,
                "Concurrent duplicate scan"
            );
            ScanOutcome::AlreadyScanned { total_scans }
        };

        Ok(ScanReceipt {
            outcome,
            user_created,
        })
    }

    /// Register a participant explicitly. Registering an existing name
    /// returns the stored participant unchanged.
    pub async fn register_user(&self, user_name: &str) -> Result<User> {
        let user_name = normalize_identifier("name", user_name)?;
        let (user, created) = self.upsert_user(&user_name, Utc::now()).await?;
        if created {
            tracing::info!(user = %user.name, "User registered");
        }
        Ok(user)
    }

    async fn upsert_user(&self, name: &str, now: DateTime<Utc>) -> Result<(User, bool)> {
        if let Some(user) = self.store.find_user(name).await? {
            return Ok((user, false));
        }
        let user = self.store.create_user(name, now).await?;
        Ok((user, true))
    }

    /// Delete a participant and all their scans. Unknown names are a no-op.
    pub async fn remove_user(&self, user_name: &str) -> Result<()> {
        let user_name = normalize_identifier("name", user_name)?;
        self.store.delete_user(&user_name).await?;
        tracing::info!(user = %user_name, "User removed");
        Ok(())
    }

    /// Delete every participant and scan (event reset).
    pub async fn clear_all(&self) -> Result<()> {
        self.store.delete_all_users().await?;
        tracing::warn!("All users and scans cleared");
        Ok(())
    }

    /// Participants, newest registration first.
    pub async fn list_users(&self) -> Result<Vec<User>> {
        let mut users = self.store.list_users().await?;
        users.reverse();
        Ok(users)
    }

    /// Every participant with their scans, in registration order.
    ///
    /// Participants without scans are included with an empty list.
    pub async fn scan_history(&self) -> Result<Vec<ScanHistory>> {
        let users = self.store.list_users().await?;
        let scans = self.store.list_scans().await?;

        let mut history: Vec<ScanHistory> = users
            .into_iter()
            .map(|user| ScanHistory {
                user,
                scans: Vec::new(),
            })
            .collect();

        for scan in scans {
            if let Some(entry) = history.iter_mut().find(|h| h.user.name == scan.user_name) {
                entry.scans.push(scan);
            }
        }

        Ok(history)
    }
}
