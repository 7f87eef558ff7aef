//! Run / Interrupt / Stop state shared between the monitor loop and the
//! termination path.
//!
//! The monitor loop owns [`Lifecycle`] and is the only caller of
//! [`Lifecycle::finish`]. The termination path holds a [`TerminationHandle`],
//! which can only move the state from `Run` to `Interrupt` and then wait.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Run,
    Interrupt,
    Stop,
}

pub struct Lifecycle {
    tx: Arc<watch::Sender<LifecycleState>>,
}

impl Lifecycle {
    pub fn new() -> (Lifecycle, TerminationHandle) {
        let (tx, _) = watch::channel(LifecycleState::Run);
        let tx = Arc::new(tx);
        (
            Lifecycle { tx: Arc::clone(&tx) },
            TerminationHandle { tx },
        )
    }

    pub fn state(&self) -> LifecycleState {
        *self.tx.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state() == LifecycleState::Run
    }

    /// Sleep for `duration`, waking early if the state leaves `Run`.
    ///
    /// Returns whether the monitor is still running afterwards.
    pub async fn pause(&self, duration: Duration) -> bool {
        let mut rx = self.tx.subscribe();
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = rx.wait_for(|s| *s != LifecycleState::Run) => {}
        }
        self.is_running()
    }

    /// Terminal transition. Called once the ledger has been drained.
    pub fn finish(self) {
        self.tx.send_replace(LifecycleState::Stop);
        debug!("lifecycle reached Stop");
    }
}

#[derive(Clone)]
pub struct TerminationHandle {
    tx: Arc<watch::Sender<LifecycleState>>,
}

impl TerminationHandle {
    pub fn state(&self) -> LifecycleState {
        *self.tx.borrow()
    }

    /// Ask the monitor to stop and wait until it has restored every process.
    ///
    /// Only the first request has an effect; later ones just wait.
    pub async fn request(&self) {
        let interrupted = self.tx.send_if_modified(|state| {
            if *state == LifecycleState::Run {
                *state = LifecycleState::Interrupt;
                true
            } else {
                false
            }
        });
        if interrupted {
            info!("Termination requested, restoring priorities");
        }
        self.stopped().await;
    }

    pub async fn stopped(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in self, so this cannot fail.
        let _ = rx.wait_for(|s| *s == LifecycleState::Stop).await;
    }
}
