//! Reference-counted lease handle
//!
//! Consumers call [`LeaseHandle::acquire`] before touching the managed
//! machine and [`LeaseHandle::release`] when done. The first acquire on an
//! idle handle asks the refresher thread to renew the lease right away; every
//! acquirer then blocks until the server reports the machine online.
//!
//! The refresher keeps renewing while references are held. Once none are,
//! the lease simply runs out on the server and the handle decays back to
//! [`Readiness::Offline`] after one quiet renewal period.

use powerlease_util::{LeaseId, WakeReason};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{ClientError, ClientResult, LeaseApi};

/// Whether the managed machine is usable from this handle's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Offline,
    TurningOn,
    Online,
}

/// Lease handle timing
#[derive(Debug, Clone)]
pub struct LeaseHandleConfig {
    /// Lease id to renew; the server picks one when `None`
    pub lease_id: Option<LeaseId>,
    /// Renewal period while references are held
    pub update_each: Duration,
    /// TTL requested on every renewal
    pub expire_in: Duration,
    /// Status poll period while waiting for the machine
    pub status_poll: Duration,
}

impl Default for LeaseHandleConfig {
    fn default() -> Self {
        Self {
            lease_id: None,
            update_each: Duration::from_secs(60),
            expire_in: Duration::from_secs(180),
            status_poll: Duration::from_secs(20),
        }
    }
}

#[derive(Debug)]
struct State {
    readiness: Readiness,
    ref_count: usize,
    lease_id: Option<LeaseId>,
    renew_requested: bool,
    stopping: bool,
}

struct Shared {
    state: Mutex<State>,
    /// Acquirers wait here for `Online`
    online_cv: Condvar,
    /// The refresher waits here for renew requests and stop
    refresh_cv: Condvar,
    api: Arc<dyn LeaseApi>,
    config: LeaseHandleConfig,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait on the refresh condvar until `timeout`, a renew request, or stop
    fn wait_refresh<'a>(
        &self,
        state: MutexGuard<'a, State>,
        timeout: Duration,
    ) -> (MutexGuard<'a, State>, WakeReason) {
        let (mut state, _) = self
            .refresh_cv
            .wait_timeout_while(state, timeout, |s| !s.renew_requested && !s.stopping)
            .unwrap_or_else(PoisonError::into_inner);

        let reason = if state.stopping {
            WakeReason::Stopped
        } else if state.renew_requested {
            state.renew_requested = false;
            WakeReason::Nudged
        } else {
            WakeReason::TimedOut
        };
        (state, reason)
    }

    /// Renew with the lock released; remembers the first id handed back
    fn renew<'a>(&'a self, state: MutexGuard<'a, State>) -> MutexGuard<'a, State> {
        let id = state.lease_id.clone();
        drop(state);

        let result = self.api.renew(id.as_ref(), Some(self.config.expire_in));

        let mut state = self.lock();
        match result {
            Ok(renewed) => {
                debug!(lease_id = %renewed, "Lease renewed");
                if state.lease_id.is_none() {
                    state.lease_id = Some(renewed);
                }
            }
            Err(e) => warn!(error = %e, "Lease renewal failed"),
        }
        state
    }

    /// Status with the lock released; errors read as "not online"
    fn check_online<'a>(&'a self, state: MutexGuard<'a, State>) -> (MutexGuard<'a, State>, bool) {
        drop(state);

        let online = match self.api.status() {
            Ok(online) => online,
            Err(e) => {
                warn!(error = %e, "Status check failed");
                false
            }
        };

        (self.lock(), online)
    }

    fn refresher_loop(&self) {
        let mut state = self.lock();

        loop {
            let (guard, reason) = self.wait_refresh(state, self.config.update_each);
            state = guard;

            match reason {
                WakeReason::Stopped => break,
                WakeReason::TimedOut
                    if state.ref_count == 0 && state.readiness != Readiness::Offline =>
                {
                    info!("No references held, machine considered offline");
                    state.readiness = Readiness::Offline;
                }
                _ => {}
            }

            if state.ref_count > 0 {
                state = self.renew(state);
            }

            while state.ref_count > 0 && state.readiness != Readiness::Online {
                let (guard, online) = self.check_online(state);
                state = guard;

                if online {
                    info!("Machine online");
                    state.readiness = Readiness::Online;
                    self.online_cv.notify_all();
                    break;
                }

                let (guard, reason) = self.wait_refresh(state, self.config.status_poll);
                state = guard;
                if reason == WakeReason::Stopped {
                    return;
                }
                state = self.renew(state);
            }

            if state.stopping {
                break;
            }
        }
    }
}

/// Blocks callers until the managed machine is online and keeps it that way
/// while any of them holds a reference
pub struct LeaseHandle {
    shared: Arc<Shared>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl LeaseHandle {
    pub fn new(api: Arc<dyn LeaseApi>, config: LeaseHandleConfig) -> Self {
        let state = State {
            readiness: Readiness::Offline,
            ref_count: 0,
            lease_id: config.lease_id.clone(),
            renew_requested: false,
            stopping: false,
        };

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                online_cv: Condvar::new(),
                refresh_cv: Condvar::new(),
                api,
                config,
            }),
            thread: Mutex::new(None),
        }
    }

    /// Spawn the refresher thread. Calling it again is a no-op.
    pub fn start(&self) -> std::io::Result<()> {
        let mut thread = self.thread.lock().unwrap_or_else(PoisonError::into_inner);
        if thread.is_some() {
            return Ok(());
        }

        let shared = self.shared.clone();
        let handle = std::thread::Builder::new()
            .name("powerlease-refresher".into())
            .spawn(move || shared.refresher_loop())?;
        *thread = Some(handle);

        debug!("Lease refresher started");
        Ok(())
    }

    /// Take a reference and block until the machine is online.
    ///
    /// Fails only if the handle is stopped while waiting.
    pub fn acquire(&self) -> ClientResult<()> {
        let mut state = self.shared.lock();
        if state.stopping {
            return Err(ClientError::Stopped);
        }

        state.ref_count += 1;
        if state.readiness == Readiness::Offline {
            info!("Requesting machine");
            state.readiness = Readiness::TurningOn;
            state.renew_requested = true;
            self.shared.refresh_cv.notify_one();
        }

        let mut state = self
            .shared
            .online_cv
            .wait_while(state, |s| s.readiness != Readiness::Online && !s.stopping)
            .unwrap_or_else(PoisonError::into_inner);

        if state.readiness != Readiness::Online {
            state.ref_count = state.ref_count.saturating_sub(1);
            return Err(ClientError::Stopped);
        }
        Ok(())
    }

    /// Drop a reference. Never blocks on the network.
    pub fn release(&self) {
        let mut state = self.shared.lock();
        match state.ref_count.checked_sub(1) {
            Some(count) => state.ref_count = count,
            None => warn!("release() without matching acquire()"),
        }
    }

    /// [`acquire`](Self::acquire), releasing when the guard drops
    pub fn hold(&self) -> ClientResult<LeaseGuard<'_>> {
        self.acquire()?;
        Ok(LeaseGuard { handle: self })
    }

    pub fn readiness(&self) -> Readiness {
        self.shared.lock().readiness
    }

    pub fn ref_count(&self) -> usize {
        self.shared.lock().ref_count
    }

    /// Id of the lease being renewed, once known
    pub fn lease_id(&self) -> Option<LeaseId> {
        self.shared.lock().lease_id.clone()
    }

    /// Stop the refresher and wake any blocked acquirers
    pub fn stop(&self) {
        {
            let mut state = self.shared.lock();
            state.stopping = true;
        }
        self.shared.refresh_cv.notify_all();
        self.shared.online_cv.notify_all();

        let thread = self.thread.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(thread) = thread {
            if thread.join().is_err() {
                warn!("Lease refresher panicked");
            }
            debug!("Lease refresher stopped");
        }
    }
}

impl Drop for LeaseHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A held reference; released on drop
pub struct LeaseGuard<'a> {
    handle: &'a LeaseHandle,
}

impl Drop for LeaseGuard<'_> {
    fn drop(&mut self) {
        self.handle.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Instant;

    #[derive(Default)]
    struct FakeApi {
        online: AtomicBool,
        failing: AtomicBool,
        renewals: Mutex<Vec<Option<LeaseId>>>,
        status_calls: AtomicUsize,
    }

    impl FakeApi {
        fn online() -> Arc<Self> {
            let api = Arc::new(Self::default());
            api.online.store(true, Ordering::SeqCst);
            api
        }

        fn renewals(&self) -> Vec<Option<LeaseId>> {
            self.renewals.lock().unwrap().clone()
        }
    }

    impl LeaseApi for FakeApi {
        fn renew(&self, id: Option<&LeaseId>, _ttl: Option<Duration>) -> ClientResult<LeaseId> {
            self.renewals.lock().unwrap().push(id.cloned());
            if self.failing.load(Ordering::SeqCst) {
                return Err(ClientError::Timeout);
            }
            Ok(id.cloned().unwrap_or_else(|| LeaseId::new("tmp:fake")))
        }

        fn status(&self) -> ClientResult<bool> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(ClientError::Status {
                    status: 500,
                    message: "store unavailable".into(),
                });
            }
            Ok(self.online.load(Ordering::SeqCst))
        }
    }

    fn fast_config() -> LeaseHandleConfig {
        LeaseHandleConfig {
            lease_id: None,
            update_each: Duration::from_millis(100),
            expire_in: Duration::from_secs(180),
            status_poll: Duration::from_millis(10),
        }
    }

    fn started(api: Arc<FakeApi>, config: LeaseHandleConfig) -> Arc<LeaseHandle> {
        let handle = Arc::new(LeaseHandle::new(api, config));
        handle.start().unwrap();
        handle
    }

    fn eventually(mut cond: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("condition not reached");
    }

    /// Run `acquire` on a thread; the receiver yields its result
    fn acquire_async(handle: &Arc<LeaseHandle>) -> mpsc::Receiver<ClientResult<()>> {
        let (tx, rx) = mpsc::channel();
        let handle = handle.clone();
        std::thread::spawn(move || {
            let _ = tx.send(handle.acquire());
        });
        rx
    }

    #[test]
    fn test_concurrent_acquirers_unblock_together() {
        let api = Arc::new(FakeApi::default());
        let handle = started(api.clone(), fast_config());

        let waiters: Vec<_> = (0..5).map(|_| acquire_async(&handle)).collect();

        eventually(|| handle.ref_count() == 5);
        eventually(|| api.status_calls.load(Ordering::SeqCst) >= 3);
        assert_eq!(handle.readiness(), Readiness::TurningOn);
        for rx in &waiters {
            assert!(rx.try_recv().is_err(), "acquire returned before online");
        }

        api.online.store(true, Ordering::SeqCst);
        for rx in waiters {
            let result = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            assert!(result.is_ok());
        }
        assert_eq!(handle.readiness(), Readiness::Online);
        assert_eq!(handle.ref_count(), 5);
    }

    #[test]
    fn test_first_acquire_renews_immediately() {
        let api = FakeApi::online();
        let config = LeaseHandleConfig {
            update_each: Duration::from_secs(3600),
            ..fast_config()
        };
        let handle = started(api.clone(), config);

        let rx = acquire_async(&handle);
        assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap().is_ok());
        assert_eq!(api.renewals().len(), 1);
    }

    #[test]
    fn test_idle_decay_after_release() {
        let api = FakeApi::online();
        let handle = started(api, fast_config());

        handle.acquire().unwrap();
        assert_eq!(handle.readiness(), Readiness::Online);
        handle.release();

        eventually(|| handle.readiness() == Readiness::Offline);
    }

    #[test]
    fn test_abandoned_turn_on_decays_to_offline() {
        let api = Arc::new(FakeApi::default());
        let handle = started(api, fast_config());

        let rx = acquire_async(&handle);
        eventually(|| handle.readiness() == Readiness::TurningOn);

        handle.release();
        assert_eq!(handle.ref_count(), 0);
        eventually(|| handle.readiness() == Readiness::Offline);

        handle.stop();
        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(result, Err(ClientError::Stopped)));
    }

    #[test]
    fn test_no_decay_while_held() {
        let api = FakeApi::online();
        let handle = started(api.clone(), fast_config());

        let _guard = handle.hold().unwrap();
        std::thread::sleep(Duration::from_millis(500));

        assert_eq!(handle.readiness(), Readiness::Online);
        // Periodic renewals kept going
        assert!(api.renewals().len() >= 3);
    }

    #[test]
    fn test_reacquire_after_decay_turns_on_again() {
        let api = FakeApi::online();
        let handle = started(api.clone(), fast_config());

        handle.hold().unwrap();
        eventually(|| handle.readiness() == Readiness::Offline);
        let renewals_before = api.renewals().len();

        api.online.store(false, Ordering::SeqCst);
        let rx = acquire_async(&handle);
        eventually(|| handle.readiness() == Readiness::TurningOn);

        api.online.store(true, Ordering::SeqCst);
        assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap().is_ok());
        assert!(api.renewals().len() > renewals_before);
    }

    #[test]
    fn test_server_id_reused() {
        let api = FakeApi::online();
        let handle = started(api.clone(), fast_config());

        let _guard = handle.hold().unwrap();
        eventually(|| api.renewals().len() >= 3);

        let renewals = api.renewals();
        assert_eq!(renewals[0], None);
        assert!(renewals[1..].iter().all(|id| id.as_ref() == Some(&LeaseId::new("tmp:fake"))));
        assert_eq!(handle.lease_id(), Some(LeaseId::new("tmp:fake")));
    }

    #[test]
    fn test_configured_id_used_from_the_start() {
        let api = FakeApi::online();
        let config = LeaseHandleConfig {
            lease_id: Some(LeaseId::new("backup-job")),
            ..fast_config()
        };
        let handle = started(api.clone(), config);

        handle.hold().unwrap();
        assert_eq!(api.renewals()[0], Some(LeaseId::new("backup-job")));
    }

    #[test]
    fn test_failures_are_tolerated() {
        let api = FakeApi::online();
        api.failing.store(true, Ordering::SeqCst);
        let handle = started(api.clone(), fast_config());

        let rx = acquire_async(&handle);
        eventually(|| api.status_calls.load(Ordering::SeqCst) >= 3);
        assert!(rx.try_recv().is_err());
        assert_eq!(handle.readiness(), Readiness::TurningOn);

        api.failing.store(false, Ordering::SeqCst);
        assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap().is_ok());
    }

    #[test]
    fn test_release_saturates_at_zero() {
        let handle = LeaseHandle::new(FakeApi::online(), fast_config());
        handle.release();
        assert_eq!(handle.ref_count(), 0);
        assert_eq!(handle.readiness(), Readiness::Offline);
    }

    #[test]
    fn test_stop_unblocks_acquirers() {
        let api = Arc::new(FakeApi::default());
        let handle = started(api, fast_config());

        let rx = acquire_async(&handle);
        eventually(|| handle.ref_count() == 1);

        handle.stop();
        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(result, Err(ClientError::Stopped)));
        assert_eq!(handle.ref_count(), 0);
        assert!(matches!(handle.acquire(), Err(ClientError::Stopped)));
    }
}
