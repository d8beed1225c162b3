//! Participant model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event participant.
///
/// The display name is the only identity: the same string always refers to
/// the same participant. Names are stored trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Display name (also used as document ID, URL-encoded)
    pub name: String,
    /// When the participant registered or first scanned
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            created_at,
        }
    }
}
