use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last probe result for a stream url.
///
/// Negative results are stored exactly like positive ones; the entry stays
/// authoritative until `expires_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationEntry {
    pub reachable: bool,
    pub checked_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl VerificationEntry {
    #[must_use]
    pub fn new(reachable: bool, ttl: std::time::Duration) -> Self {
        let checked_at = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        Self {
            reachable,
            checked_at,
            expires_at: checked_at.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }
}
