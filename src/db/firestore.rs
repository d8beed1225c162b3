// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore storage backend.
//!
//! Collections:
//! - `users/{user:<name>}`: participant profiles
//! - `scans/{scan:<sha256>}`: one document per (participant, slide)
//!
//! Scan documents are written with Firestore's create-only insert, so the
//! document ID acts as a uniqueness constraint: a second insert for the same
//! pair fails with `ALREADY_EXISTS` and is reported as
//! [`StorageError::Duplicate`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firestore::errors::FirestoreError;
use futures_util::{stream, StreamExt};
use sha2::{Digest, Sha256};

use crate::db::{
    aggregate_scan_stats, collections, sort_by_registration, ScanStore, StorageError,
    StorageResult,
};
use crate::models::{ScanRecord, User, UserScanStats};

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

// Maximum concurrent transactions during bulk deletion
const MAX_CONCURRENT_DB_OPS: usize = 4;

/// Document ID for a participant.
///
/// The prefix keeps IDs clear of Firestore's reserved `.`/`..`/`__*__` forms.
pub fn user_document_id(name: &str) -> String {
    format!("user:{}", urlencoding::encode(name))
}

/// Document ID for a scan: `scan:` followed by the hex SHA-256 of the pair.
///
/// The length is fixed whatever the identifiers contain. `:` is always
/// percent-encoded inside the parts, so distinct pairs hash distinct keys.
pub fn scan_document_id(user_name: &str, slide_id: &str) -> String {
    let key = format!(
        "{}:{}",
        urlencoding::encode(user_name),
        urlencoding::encode(slide_id)
    );
    format!("scan:{}", hex::encode(Sha256::digest(key.as_bytes())))
}

fn backend_error(context: &str, e: FirestoreError) -> StorageError {
    StorageError::Backend(format!("{}: {}", context, e))
}

/// Firestore-backed scan store.
#[derive(Clone)]
pub struct FirestoreStore {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> StorageResult<Self> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| backend_error("Failed to connect to Firestore", e))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> StorageResult<Self> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| backend_error("Failed to connect to Firestore Emulator", e))?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client for testing.
    ///
    /// Every operation fails with [`StorageError::Backend`].
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> StorageResult<&firestore::FirestoreDb> {
        self.client.as_ref().ok_or_else(|| {
            StorageError::Backend("Database not connected (offline mode)".to_string())
        })
    }

    async fn scans_for_user(&self, user_name: &str) -> StorageResult<Vec<ScanRecord>> {
        let user_name = user_name.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::SCANS)
            .filter(move |q| q.field("user_name").eq(user_name.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| backend_error("Failed to query scans", e))
    }

    async fn all_users(&self) -> StorageResult<Vec<User>> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .obj()
            .query()
            .await
            .map_err(|e| backend_error("Failed to query users", e))
    }

    async fn all_scans(&self) -> StorageResult<Vec<ScanRecord>> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::SCANS)
            .obj()
            .query()
            .await
            .map_err(|e| backend_error("Failed to query scans", e))
    }

    /// Delete documents in transactional chunks, a few chunks at a time.
    async fn batch_delete<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> StorageResult<()>
    where
        T: Sync,
        F: Fn(&T) -> String + Sync,
    {
        let client = self.get_client()?;
        let id_extractor = &id_extractor;

        stream::iter(items.chunks(BATCH_SIZE))
            .map(|chunk| async move {
                let mut transaction = client
                    .begin_transaction()
                    .await
                    .map_err(|e| backend_error("Failed to begin transaction", e))?;

                for item in chunk {
                    let doc_id = id_extractor(item);
                    client
                        .fluent()
                        .delete()
                        .from(collection)
                        .document_id(&doc_id)
                        .add_to_transaction(&mut transaction)
                        .map_err(|e| {
                            backend_error(&format!("Failed to add deletion for {}", collection), e)
                        })?;
                }

                transaction
                    .commit()
                    .await
                    .map_err(|e| backend_error("Failed to commit batch deletion", e))?;

                Ok::<_, StorageError>(())
            })
            .boxed()
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<StorageResult<()>>>()
            .await
            .into_iter()
            .collect::<StorageResult<Vec<()>>>()?;

        Ok(())
    }
}

#[async_trait]
impl ScanStore for FirestoreStore {
    async fn find_user(&self, name: &str) -> StorageResult<Option<User>> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(&user_document_id(name))
            .await
            .map_err(|e| backend_error("Failed to read user", e))
    }

    async fn create_user(&self, name: &str, created_at: DateTime<Utc>) -> StorageResult<User> {
        let user = User::new(name, created_at);

        let result: Result<User, FirestoreError> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(user_document_id(name))
            .object(&user)
            .execute()
            .await;

        match result {
            Ok(created) => {
                tracing::debug!(user = name, "Created user document");
                Ok(created)
            }
            // Another request registered the same name first.
            Err(FirestoreError::DataConflictError(_)) => self
                .find_user(name)
                .await?
                .ok_or_else(|| StorageError::UserMissing(name.to_string())),
            Err(e) => Err(backend_error("Failed to create user", e)),
        }
    }

    async fn scan_exists(&self, user_name: &str, slide_id: &str) -> StorageResult<bool> {
        let existing: Option<ScanRecord> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::SCANS)
            .obj()
            .one(&scan_document_id(user_name, slide_id))
            .await
            .map_err(|e| backend_error("Failed to read scan", e))?;
        Ok(existing.is_some())
    }

    async fn insert_scan(&self, scan: &ScanRecord) -> StorageResult<()> {
        let doc_id = scan_document_id(&scan.user_name, &scan.slide_id);
        let client = self.get_client()?;

        let result: Result<ScanRecord, FirestoreError> = client
            .fluent()
            .insert()
            .into(collections::SCANS)
            .document_id(&doc_id)
            .object(scan)
            .execute()
            .await;

        match result {
            Ok(_) => {}
            Err(FirestoreError::DataConflictError(_)) => return Err(StorageError::Duplicate),
            Err(e) => return Err(backend_error("Failed to insert scan", e)),
        }

        // `delete_user` removes the user document before sweeping its scans,
        // so a scan whose user is gone at this point may have missed the sweep.
        if self.find_user(&scan.user_name).await?.is_none() {
            client
                .fluent()
                .delete()
                .from(collections::SCANS)
                .document_id(&doc_id)
                .execute()
                .await
                .map_err(|e| backend_error("Failed to remove orphan scan", e))?;
            tracing::warn!(user = %scan.user_name, "User removed during scan insert");
            return Err(StorageError::UserMissing(scan.user_name.clone()));
        }

        Ok(())
    }

    async fn count_scans_for_user(&self, user_name: &str) -> StorageResult<u32> {
        Ok(self.scans_for_user(user_name).await?.len() as u32)
    }

    async fn list_users_with_scan_stats(&self) -> StorageResult<Vec<UserScanStats>> {
        let (users, scans) =
            futures_util::future::try_join(self.list_users(), self.all_scans()).await?;
        Ok(aggregate_scan_stats(&users, &scans))
    }

    async fn list_users(&self) -> StorageResult<Vec<User>> {
        let mut users = self.all_users().await?;
        sort_by_registration(&mut users);
        Ok(users)
    }

    async fn list_scans(&self) -> StorageResult<Vec<ScanRecord>> {
        let mut scans = self.all_scans().await?;
        scans.sort_by(|a, b| {
            a.scanned_at
                .cmp(&b.scanned_at)
                .then_with(|| a.user_name.cmp(&b.user_name))
                .then_with(|| a.slide_id.cmp(&b.slide_id))
        });
        Ok(scans)
    }

    async fn delete_user(&self, name: &str) -> StorageResult<()> {
        // User first: a scan inserted after this point is rolled back by
        // `insert_scan`, one inserted before it is found by the sweep below.
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::USERS)
            .document_id(user_document_id(name))
            .execute()
            .await
            .map_err(|e| backend_error("Failed to delete user", e))?;

        let scans = self.scans_for_user(name).await?;
        self.batch_delete(&scans, collections::SCANS, |scan: &ScanRecord| {
            scan_document_id(&scan.user_name, &scan.slide_id)
        })
        .await?;

        tracing::info!(user = name, scans = scans.len(), "User data deletion complete");
        Ok(())
    }

    async fn delete_all_users(&self) -> StorageResult<()> {
        let users = self.all_users().await?;
        self.batch_delete(&users, collections::USERS, |user: &User| {
            user_document_id(&user.name)
        })
        .await?;

        let scans = self.all_scans().await?;
        self.batch_delete(&scans, collections::SCANS, |scan: &ScanRecord| {
            scan_document_id(&scan.user_name, &scan.slide_id)
        })
        .await?;

        tracing::info!(
            users = users.len(),
            scans = scans.len(),
            "Cleared all participants"
        );
        Ok(())
    }
}
