//! Puts every demoted process back at its original priority

use crate::ledger::PriorityLedger;
use crate::platform::Platform;
use std::io;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    pub restored: usize,
    /// Entries whose process had exited or could not be reset.
    pub skipped: usize,
}

pub struct RestorationManager;

impl RestorationManager {
    /// Visit each ledger entry exactly once.
    ///
    /// Ledger membership alone decides what is restored. Entries are removed
    /// only when the reset succeeds; everything else is left for the ledger to
    /// be dropped with the process.
    pub fn restore_all<P: Platform>(platform: &P, ledger: &mut PriorityLedger) -> RestoreSummary {
        let mut summary = RestoreSummary::default();
        for (pid, original) in ledger.entries() {
            match platform.set_priority(pid, original) {
                Ok(()) => {
                    ledger.remove(pid);
                    summary.restored += 1;
                    debug!(pid, original = %original, "Restored");
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    summary.skipped += 1;
                    debug!(pid, "Process exited before restoration");
                }
                Err(e) => {
                    summary.skipped += 1;
                    debug!(pid, "Restoration skipped: {}", e);
                }
            }
        }
        info!(
            restored = summary.restored,
            skipped = summary.skipped,
            "Restoration complete"
        );
        summary
    }
}
