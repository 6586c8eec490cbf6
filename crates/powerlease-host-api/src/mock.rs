//! Mock power controller for testing

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::{PowerController, PowerError, PowerResult};

/// Mock power controller for unit/integration testing
///
/// The machine is a single boolean. Wakes and successful shutdowns flip it
/// (unless configured otherwise) and every call is counted.
#[derive(Debug, Clone)]
pub struct MockPower {
    online: Arc<AtomicBool>,
    wakes: Arc<AtomicU64>,
    shutdowns: Arc<AtomicU64>,
    probes: Arc<AtomicU64>,

    /// Whether a wake immediately makes the machine probe online
    pub wake_brings_online: Arc<AtomicBool>,

    /// Configure wake to fail
    pub fail_wake: Arc<AtomicBool>,

    /// Configure shutdown to fail (machine stays on)
    pub fail_shutdown: Arc<AtomicBool>,
}

impl MockPower {
    pub fn new() -> Self {
        Self {
            online: Arc::new(AtomicBool::new(false)),
            wakes: Arc::new(AtomicU64::new(0)),
            shutdowns: Arc::new(AtomicU64::new(0)),
            probes: Arc::new(AtomicU64::new(0)),
            wake_brings_online: Arc::new(AtomicBool::new(true)),
            fail_wake: Arc::new(AtomicBool::new(false)),
            fail_shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start with the machine already on
    pub fn online() -> Self {
        let mock = Self::new();
        mock.set_online(true);
        mock
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub fn wake_count(&self) -> u64 {
        self.wakes.load(Ordering::SeqCst)
    }

    /// Shutdown attempts, failed ones included
    pub fn shutdown_count(&self) -> u64 {
        self.shutdowns.load(Ordering::SeqCst)
    }

    pub fn probe_count(&self) -> u64 {
        self.probes.load(Ordering::SeqCst)
    }
}

impl Default for MockPower {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PowerController for MockPower {
    async fn wake(&self) -> PowerResult<()> {
        self.wakes.fetch_add(1, Ordering::SeqCst);

        if self.fail_wake.load(Ordering::SeqCst) {
            return Err(PowerError::Network("Mock wake failure".into()));
        }

        if self.wake_brings_online.load(Ordering::SeqCst) {
            self.set_online(true);
        }
        debug!(online = self.is_online(), "Mock wake");
        Ok(())
    }

    async fn probe(&self, _timeout: Duration) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.is_online()
    }

    async fn shutdown(&self) -> PowerResult<()> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);

        if self.fail_shutdown.load(Ordering::SeqCst) {
            return Err(PowerError::RemoteCommand("Mock shutdown failure".into()));
        }

        self.set_online(false);
        debug!("Mock shutdown");
        Ok(())
    }
}
