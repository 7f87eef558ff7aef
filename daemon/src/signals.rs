//! Termination notifications from the host

use tracing::info;

/// Handlers for SIGINT, SIGTERM and SIGHUP.
///
/// Installing them replaces the default disposition, so once this exists a
/// signal can no longer kill the process outright.
#[cfg(unix)]
pub struct TerminationSignals {
    sigint: tokio::signal::unix::Signal,
    sigterm: tokio::signal::unix::Signal,
    sighup: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl TerminationSignals {
    pub fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
            sighup: signal(SignalKind::hangup())?,
        })
    }

    /// Resolves on the first of the three signals.
    pub async fn recv(&mut self) {
        tokio::select! {
            _ = self.sigint.recv() => info!("Received SIGINT"),
            _ = self.sigterm.recv() => info!("Received SIGTERM"),
            _ = self.sighup.recv() => info!("Received SIGHUP"),
        }
    }
}

#[cfg(not(unix))]
pub struct TerminationSignals;

#[cfg(not(unix))]
impl TerminationSignals {
    pub fn install() -> std::io::Result<Self> {
        Ok(Self)
    }

    pub async fn recv(&mut self) {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C");
        }
    }
}
