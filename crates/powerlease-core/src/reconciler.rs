//! Reconciliation loop: lease presence in, power actions out

use chrono::{DateTime, Utc};
use powerlease_host_api::PowerController;
use powerlease_store::LeaseStore;
use powerlease_util::{add_seconds, saturating_until, Clock, PollSignal, WakeReason};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Loop timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilerSettings {
    /// Delay between "no leases" and shutdown
    pub grace_period: Duration,
    /// Cadence while leases exist or the machine is on
    pub poll_interval: Duration,
    /// Cadence while idle and off
    pub idle_interval: Duration,
    /// Upper bound on each reachability probe
    pub probe_timeout: Duration,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(60),
            poll_interval: Duration::from_secs(20),
            idle_interval: Duration::from_secs(600),
            probe_timeout: Duration::from_millis(100),
        }
    }
}

/// What a tick did to the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    None,
    Wake,
    WakeFailed,
    Shutdown,
    ShutdownFailed,
    /// The lease table could not be read; nothing was probed or changed
    Skipped,
}

/// Outcome of one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub has_leases: bool,
    /// Machine state after the tick's action (false once shut down)
    pub online: bool,
    pub action: PowerAction,
    pub swept: usize,
    pub next_wait: Duration,
}

/// Maps the live lease set onto wake/shutdown calls
///
/// Sole owner of the shutdown timer. One instance runs per managed machine.
pub struct Reconciler {
    store: Arc<dyn LeaseStore>,
    power: Arc<dyn PowerController>,
    clock: Arc<dyn Clock>,
    settings: ReconcilerSettings,
    shutdown_at: Option<DateTime<Utc>>,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn LeaseStore>,
        power: Arc<dyn PowerController>,
        clock: Arc<dyn Clock>,
        settings: ReconcilerSettings,
    ) -> Self {
        Self {
            store,
            power,
            clock,
            settings,
            shutdown_at: None,
        }
    }

    /// When the pending shutdown is due, if one is armed
    pub fn shutdown_at(&self) -> Option<DateTime<Utc>> {
        self.shutdown_at
    }

    /// Run a single reconciliation pass
    pub async fn tick(&mut self) -> TickReport {
        let now = self.clock.now();

        let has_leases = match self.store.has_any(now) {
            Ok(has_leases) => has_leases,
            Err(e) => {
                warn!(error = %e, "Failed to read leases, skipping tick");
                return TickReport {
                    has_leases: false,
                    online: false,
                    action: PowerAction::Skipped,
                    swept: 0,
                    next_wait: self.settings.poll_interval,
                };
            }
        };

        let mut online = self.power.probe(self.settings.probe_timeout).await;
        let mut action = PowerAction::None;

        if has_leases {
            if let Some(at) = self.shutdown_at.take() {
                info!(shutdown_at = %at, "Leases renewed, pending shutdown cancelled");
            }

            if !online {
                action = match self.power.wake().await {
                    Ok(()) => {
                        info!("Leases active and machine offline, wake sent");
                        PowerAction::Wake
                    }
                    Err(e) => {
                        warn!(error = %e, "Wake failed");
                        PowerAction::WakeFailed
                    }
                };
            }
        } else if online {
            if let Some(at) = self.shutdown_at
                && now >= at
            {
                action = match self.power.shutdown().await {
                    Ok(()) => {
                        info!(shutdown_at = %at, "Grace period over, machine shut down");
                        self.shutdown_at = None;
                        online = false;
                        PowerAction::Shutdown
                    }
                    Err(e) => {
                        warn!(error = %e, "Shutdown failed, will retry");
                        PowerAction::ShutdownFailed
                    }
                };
            }
        } else if let Some(at) = self.shutdown_at.take() {
            debug!(shutdown_at = %at, "Machine already offline, pending shutdown dropped");
        }

        let swept = match self.store.sweep(now) {
            Ok(swept) => swept,
            Err(e) => {
                warn!(error = %e, "Failed to sweep expired leases");
                0
            }
        };

        let next_wait = self.next_wait(now, has_leases, online, action);

        TickReport {
            has_leases,
            online,
            action,
            swept,
            next_wait,
        }
    }

    fn next_wait(
        &mut self,
        now: DateTime<Utc>,
        has_leases: bool,
        online: bool,
        action: PowerAction,
    ) -> Duration {
        let poll = self.settings.poll_interval;

        if has_leases || action == PowerAction::Shutdown {
            return poll;
        }

        if !online {
            return self.settings.idle_interval;
        }

        let grace = self.settings.grace_period;
        let at = *self.shutdown_at.get_or_insert_with(|| {
            let at = add_seconds(now, grace);
            info!(shutdown_at = %at, "No active leases, shutdown scheduled");
            at
        });

        let remaining = saturating_until(at, now);
        if remaining.is_zero() {
            poll
        } else {
            remaining.min(poll)
        }
    }

    /// Tick until `signal` is stopped, then power the machine off if it is on
    pub async fn run(mut self, signal: Arc<PollSignal>) {
        info!(settings = ?self.settings, "Reconciler started");

        loop {
            let report = self.tick().await;
            debug!(
                has_leases = report.has_leases,
                online = report.online,
                action = ?report.action,
                swept = report.swept,
                next_wait = ?report.next_wait,
                "Tick"
            );

            match signal.wait(report.next_wait).await {
                WakeReason::Stopped => break,
                WakeReason::Nudged => debug!("Reconciler nudged"),
                WakeReason::TimedOut => {}
            }
        }

        self.final_shutdown().await;
        info!("Reconciler stopped");
    }

    async fn final_shutdown(&self) {
        if !self.power.probe(self.settings.probe_timeout).await {
            return;
        }

        info!("Stopping with machine online, shutting it down");
        if let Err(e) = self.power.shutdown().await {
            warn!(error = %e, "Final shutdown failed");
        }
    }
}
