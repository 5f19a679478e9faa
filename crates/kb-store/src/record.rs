// record.rs — PlayerRecord: one member holding the role until a deadline.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A member who holds the role until `expires_at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerRecord {
    /// Platform member id.
    pub id: String,

    /// When the role must be revoked.
    pub expires_at: DateTime<Utc>,
}

impl PlayerRecord {
    /// A record expiring `ttl` from now.
    pub fn new(id: impl Into<String>, ttl: Duration) -> Self {
        Self {
            id: id.into(),
            expires_at: Utc::now() + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
