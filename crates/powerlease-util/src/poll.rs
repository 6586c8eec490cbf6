//! Sleep-until-deadline-or-nudged primitive
//!
//! Both polling loops in powerlease (the server's reconciliation loop and the
//! client's lease refresher) sleep until the earlier of a deadline or an
//! explicit nudge. [`WakeReason`] is the vocabulary both report; [`PollSignal`]
//! is the async implementation used by the server loop.

use std::time::Duration;
use tokio::sync::{watch, Notify};

/// Why a poller woke up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeReason {
    /// Something changed that the poller should look at now
    Nudged,
    /// The wait interval elapsed with nothing happening
    TimedOut,
    /// The poller has been asked to exit
    Stopped,
}

/// Nudge/stop signal for an async polling loop
///
/// A nudge delivered while the loop is busy is remembered and ends the next
/// wait immediately. Stop is sticky: once requested, every wait returns
/// [`WakeReason::Stopped`].
#[derive(Debug)]
pub struct PollSignal {
    nudge: Notify,
    stop_tx: watch::Sender<bool>,
}

impl PollSignal {
    pub fn new() -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            nudge: Notify::new(),
            stop_tx,
        }
    }

    /// Cut the current (or next) wait short
    pub fn nudge(&self) {
        self.nudge.notify_one();
    }

    /// Ask the loop to exit
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }

    /// Wait up to `timeout` for a nudge or a stop request
    pub async fn wait(&self, timeout: Duration) -> WakeReason {
        let mut stop_rx = self.stop_tx.subscribe();
        if *stop_rx.borrow_and_update() {
            return WakeReason::Stopped;
        }

        tokio::select! {
            biased;
            _ = stop_rx.wait_for(|stopped| *stopped) => WakeReason::Stopped,
            _ = self.nudge.notified() => WakeReason::Nudged,
            _ = tokio::time::sleep(timeout) => WakeReason::TimedOut,
        }
    }
}

impl Default for PollSignal {
    fn default() -> Self {
        Self::new()
    }
}
