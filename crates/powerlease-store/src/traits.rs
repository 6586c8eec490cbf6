//! Store trait definitions

use chrono::{DateTime, Utc};
use powerlease_util::LeaseId;
use std::time::Duration;

use crate::{Lease, Renewal, StoreResult};

/// The lease table
///
/// Every method is atomic with respect to the others. Time is passed in by
/// the caller so the store never reads a clock itself.
pub trait LeaseStore: Send + Sync {
    /// Create or extend a lease.
    ///
    /// With no `id` a fresh one is generated. A new row gets
    /// `expire_at = now + ttl` (or never expires when `ttl` is `None`); an
    /// existing row only has its `expire_at` replaced.
    fn renew(
        &self,
        id: Option<&LeaseId>,
        ttl: Option<Duration>,
        now: DateTime<Utc>,
    ) -> StoreResult<Renewal>;

    /// Remove a lease; returns whether a row existed
    fn delete(&self, id: &LeaseId) -> StoreResult<bool>;

    /// All rows, expired-but-unswept included, ordered by id
    fn list(&self) -> StoreResult<Vec<Lease>>;

    /// Whether any lease is live at `now` (never expires, or expires after `now`)
    fn has_any(&self, now: DateTime<Utc>) -> StoreResult<bool>;

    /// Delete every lease whose `expire_at <= now`; returns how many went
    fn sweep(&self, now: DateTime<Utc>) -> StoreResult<usize>;

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
