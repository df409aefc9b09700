//! Claim entries.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// One claim over a fingerprint.
///
/// Born at claim time, immutable except deletion; at most one live
/// (non-expired) entry exists per fingerprint at a time. Invariant:
/// `expires_at > first_seen_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupEntry {
    pub fingerprint: String,
    pub batch_id: Uuid,
    pub project_id: String,
    pub first_seen_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl DedupEntry {
    /// Creates an entry claimed now, expiring after `ttl`.
    ///
    /// A zero TTL is clamped to one millisecond so the expiry invariant holds.
    pub fn new(
        fingerprint: impl Into<String>,
        batch_id: Uuid,
        project_id: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        let first_seen_at = Utc::now();
        let ttl = ChronoDuration::from_std(ttl)
            .unwrap_or_else(|_| ChronoDuration::milliseconds(1))
            .max(ChronoDuration::milliseconds(1));

        Self {
            fingerprint: fingerprint.into(),
            batch_id,
            project_id: project_id.into(),
            first_seen_at,
            expires_at: first_seen_at + ttl,
        }
    }

    /// Remaining lifetime from now; zero once expired.
    pub fn remaining_ttl(&self) -> Duration {
        (self.expires_at - Utc::now()).to_std().unwrap_or(Duration::ZERO)
    }

    /// Whether the claim window has passed.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}
