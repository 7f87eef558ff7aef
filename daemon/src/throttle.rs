//! Demotes processes to idle priority, recording where they started

use crate::ledger::PriorityLedger;
use crate::platform::{Platform, PriorityClass};
use std::io;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Demotion {
    /// First demotion of this pid; the ledger gained an entry.
    Recorded(PriorityClass),
    /// Already tracked; idle was re-asserted.
    Reasserted,
    /// Untracked and already idle, so there was nothing to do.
    AlreadyIdle,
    /// Left alone: we would not be allowed to put its priority back.
    Unrestorable(PriorityClass),
}

pub struct PriorityThrottleController;

impl PriorityThrottleController {
    /// Best effort: an error means this pid is skipped, nothing more.
    pub fn demote<P: Platform>(
        platform: &P,
        ledger: &mut PriorityLedger,
        pid: u32,
    ) -> io::Result<Demotion> {
        if ledger.contains(pid) {
            platform.set_priority(pid, PriorityClass::IDLE)?;
            return Ok(Demotion::Reasserted);
        }

        let original = platform.priority(pid)?;
        if original.is_idle() {
            return Ok(Demotion::AlreadyIdle);
        }
        if !platform.can_restore(original) {
            debug!(pid, original = %original, "Not demoting, original priority is out of reach");
            return Ok(Demotion::Unrestorable(original));
        }
        platform.set_priority(pid, PriorityClass::IDLE)?;
        ledger.record(pid, original);
        info!(pid, original = %original, "Demoted to idle");
        Ok(Demotion::Recorded(original))
    }

    /// Demote every pid, returning how many are idle now because of us.
    pub fn demote_all<P: Platform>(
        platform: &P,
        ledger: &mut PriorityLedger,
        pids: impl IntoIterator<Item = u32>,
    ) -> usize {
        let mut demoted = 0;
        for pid in pids {
            match Self::demote(platform, ledger, pid) {
                Ok(Demotion::Recorded(_)) | Ok(Demotion::Reasserted) => demoted += 1,
                Ok(Demotion::AlreadyIdle) | Ok(Demotion::Unrestorable(_)) => {}
                Err(e) => debug!(pid, "Demotion skipped: {}", e),
            }
        }
        demoted
    }
}
