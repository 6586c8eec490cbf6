//! Lease records

use chrono::{DateTime, Utc};
use powerlease_util::LeaseId;
use serde::{Deserialize, Serialize};

/// A renewable claim on the managed machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    pub id: LeaseId,

    /// `None` means the lease never expires
    pub expire_at: Option<DateTime<Utc>>,
}

impl Lease {
    /// Whether the lease still counts towards keeping the machine on
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match self.expire_at {
            None => true,
            Some(at) => at > now,
        }
    }
}

/// Outcome of a renew call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renewal {
    pub id: LeaseId,
    pub expire_at: Option<DateTime<Utc>>,

    /// True when the row did not exist before this call
    pub created: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use powerlease_util::from_unix_seconds;

    #[test]
    fn expiry_boundary_is_inactive() {
        let now = from_unix_seconds(1_000).unwrap();
        let lease = |expire_at| Lease {
            id: LeaseId::new("a"),
            expire_at,
        };

        assert!(lease(None).is_active(now));
        assert!(lease(from_unix_seconds(1_001)).is_active(now));
        assert!(!lease(from_unix_seconds(1_000)).is_active(now));
        assert!(!lease(from_unix_seconds(999)).is_active(now));
    }
}
