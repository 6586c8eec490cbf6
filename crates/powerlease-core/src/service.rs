//! Lease operations plus ownership of the reconciliation task

use powerlease_config::Settings;
use powerlease_host_api::PowerController;
use powerlease_store::{Lease, LeaseStore};
use powerlease_util::{Clock, LeaseId, PollSignal};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{CoreError, CoreResult, Reconciler, ReconcilerSettings};

/// Service-level settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    /// TTL given to renewals that name neither an id nor a TTL
    pub default_ttl: Duration,
    pub reconciler: ReconcilerSettings,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(300),
            reconciler: ReconcilerSettings::default(),
        }
    }
}

impl From<&Settings> for ServiceSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            default_ttl: settings.leases.default_ttl,
            reconciler: ReconcilerSettings {
                grace_period: settings.leases.grace_period,
                poll_interval: settings.leases.poll_interval,
                idle_interval: settings.leases.idle_interval,
                probe_timeout: settings.machine.probe_timeout,
            },
        }
    }
}

/// Power manager for one machine
///
/// Explicitly constructed; several may coexist in one process.
pub struct PowerService {
    store: Arc<dyn LeaseStore>,
    power: Arc<dyn PowerController>,
    clock: Arc<dyn Clock>,
    settings: ServiceSettings,
    signal: Arc<PollSignal>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PowerService {
    pub fn new(
        store: Arc<dyn LeaseStore>,
        power: Arc<dyn PowerController>,
        clock: Arc<dyn Clock>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            store,
            power,
            clock,
            settings,
            signal: Arc::new(PollSignal::new()),
            task: Mutex::new(None),
        }
    }

    /// Spawn the reconciliation task on the current tokio runtime
    pub fn start(&self) -> CoreResult<()> {
        if self.signal.is_stopped() {
            return Err(CoreError::Stopped);
        }

        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.is_some() {
            return Err(CoreError::AlreadyRunning);
        }

        let reconciler = Reconciler::new(
            self.store.clone(),
            self.power.clone(),
            self.clock.clone(),
            self.settings.reconciler,
        );
        *task = Some(tokio::spawn(reconciler.run(self.signal.clone())));

        info!("Power service started");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Stop the loop and wait for it (including its final shutdown check).
    /// Calling it again is a no-op.
    pub async fn stop(&self) {
        self.signal.stop();

        let task = self.task.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "Reconciler task ended abnormally");
            }
            info!("Power service stopped");
        }
    }

    /// Create or extend a lease, returning its id.
    ///
    /// With neither id nor TTL the default TTL applies; an id without a TTL
    /// never expires.
    pub fn renew_lease(&self, id: Option<LeaseId>, ttl: Option<Duration>) -> CoreResult<LeaseId> {
        let ttl = match (&id, ttl) {
            (None, None) => Some(self.settings.default_ttl),
            (_, ttl) => ttl,
        };

        let renewal = self.store.renew(id.as_ref(), ttl, self.clock.now())?;
        if renewal.created {
            info!(lease_id = %renewal.id, expire_at = ?renewal.expire_at, "Lease created");
            self.signal.nudge();
        } else {
            debug!(lease_id = %renewal.id, expire_at = ?renewal.expire_at, "Lease extended");
        }

        Ok(renewal.id)
    }

    /// Remove a lease; returns whether it existed
    pub fn delete_lease(&self, id: &LeaseId) -> CoreResult<bool> {
        let deleted = self.store.delete(id)?;
        if deleted {
            info!(lease_id = %id, "Lease deleted");
            self.signal.nudge();
        }
        Ok(deleted)
    }

    /// Every stored lease, expired-but-unswept included
    pub fn list_leases(&self) -> CoreResult<Vec<Lease>> {
        Ok(self.store.list()?)
    }

    /// Probe the machine now
    pub async fn is_online(&self) -> bool {
        self.power.probe(self.settings.reconciler.probe_timeout).await
    }

    pub fn is_store_healthy(&self) -> bool {
        self.store.is_healthy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use powerlease_host_api::MockPower;
    use powerlease_store::SqliteStore;
    use powerlease_util::ManualClock;

    const T0: i64 = 1_700_000_000;

    fn service(
        power: MockPower,
        settings: ServiceSettings,
    ) -> (PowerService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_unix(T0));
        let service = PowerService::new(
            Arc::new(SqliteStore::in_memory().unwrap()),
            Arc::new(power),
            clock.clone(),
            settings,
        );
        (service, clock)
    }

    /// Long enough that only a nudge can end a wait during a test
    fn slow_loop() -> ServiceSettings {
        ServiceSettings {
            reconciler: ReconcilerSettings {
                poll_interval: Duration::from_secs(3600),
                idle_interval: Duration::from_secs(3600),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    async fn eventually(mut cond: impl FnMut() -> bool) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[test]
    fn test_default_ttl_only_for_anonymous_renewals() {
        let (service, _clock) = service(MockPower::new(), ServiceSettings::default());

        let anonymous = service.renew_lease(None, None).unwrap();
        assert!(anonymous.is_generated());

        let named = LeaseId::new("backup-job");
        service.renew_lease(Some(named.clone()), None).unwrap();
        let ttl = service
            .renew_lease(Some(LeaseId::new("short")), Some(Duration::from_secs(30)))
            .unwrap();

        let leases = service.list_leases().unwrap();
        let expiry = |id: &LeaseId| {
            leases
                .iter()
                .find(|l| &l.id == id)
                .and_then(|l| l.expire_at)
                .map(|at| at.timestamp())
        };
        assert_eq!(expiry(&anonymous), Some(T0 + 300));
        assert_eq!(expiry(&named), None);
        assert_eq!(expiry(&ttl), Some(T0 + 30));
    }

    #[test]
    fn test_delete_lease() {
        let (service, _clock) = service(MockPower::new(), ServiceSettings::default());
        let id = service.renew_lease(None, None).unwrap();

        assert!(service.delete_lease(&id).unwrap());
        assert!(!service.delete_lease(&id).unwrap());
        assert!(service.list_leases().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_new_lease_nudges_loop() {
        let power = MockPower::new();
        let (service, _clock) = service(power.clone(), slow_loop());
        service.start().unwrap();

        // First tick: idle and offline, then a one-hour wait
        eventually(|| power.probe_count() >= 1).await;
        assert_eq!(power.wake_count(), 0);

        service.renew_lease(None, None).unwrap();
        eventually(|| power.wake_count() == 1).await;

        service.stop().await;
    }

    #[tokio::test]
    async fn test_delete_nudges_loop() {
        let power = MockPower::online();
        let (service, _clock) = service(power.clone(), slow_loop());
        let id = service.renew_lease(Some(LeaseId::new("job")), None).unwrap();
        service.start().unwrap();
        eventually(|| power.probe_count() >= 1).await;

        service.delete_lease(&id).unwrap();
        eventually(|| power.probe_count() >= 2).await;

        // Grace period still running
        assert_eq!(power.shutdown_count(), 0);
        service.stop().await;
    }

    #[tokio::test]
    async fn test_lifecycle_errors() {
        let (service, _clock) = service(MockPower::new(), slow_loop());

        service.start().unwrap();
        assert!(service.is_running());
        assert!(matches!(service.start(), Err(CoreError::AlreadyRunning)));

        service.stop().await;
        assert!(!service.is_running());
        assert!(matches!(service.start(), Err(CoreError::Stopped)));

        // Second stop is a no-op
        service.stop().await;
    }

    #[tokio::test]
    async fn test_stop_shuts_down_online_machine() {
        let power = MockPower::online();
        let (service, _clock) = service(power.clone(), slow_loop());
        service.start().unwrap();
        eventually(|| power.probe_count() >= 1).await;

        service.stop().await;
        assert_eq!(power.shutdown_count(), 1);
        assert!(!service.is_online().await);
    }
}
