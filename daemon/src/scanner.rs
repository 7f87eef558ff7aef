//! Arms one per-name CPU counter for every process that could be demoted

use crate::lifecycle::Lifecycle;
use crate::platform::{LoadCounter, Platform};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Counters whose cold read has already been taken, keyed by process name.
pub type ArmedCounters<C> = HashMap<String, C>;

pub struct CandidateScanner {
    item_delay: Duration,
}

impl CandidateScanner {
    pub fn new(item_delay: Duration) -> Self {
        Self { item_delay }
    }

    /// Walk the live process set and arm a counter per distinct name.
    ///
    /// Processes already at idle priority are skipped, as are names armed
    /// earlier in the same scan. A failure on one process only skips that
    /// process. If the monitor is interrupted the partial map is returned.
    pub async fn scan<P: Platform>(
        &self,
        platform: &P,
        lifecycle: &Lifecycle,
    ) -> ArmedCounters<P::Counter> {
        let mut armed = ArmedCounters::new();
        let processes = match platform.list_processes() {
            Ok(processes) => processes,
            Err(e) => {
                warn!("Failed to list processes: {}", e);
                return armed;
            }
        };

        for process in processes {
            if !lifecycle.is_running() {
                break;
            }
            if process.priority.is_idle() || armed.contains_key(&process.name) {
                continue;
            }

            let counter = platform.process_counter(&process.name).and_then(|mut counter| {
                counter.read()?;
                Ok(counter)
            });
            match counter {
                Ok(counter) => {
                    trace!(pid = process.pid, name = %process.name, "armed counter");
                    armed.insert(process.name, counter);
                }
                Err(e) => {
                    debug!(pid = process.pid, name = %process.name, "Skipping candidate: {}", e);
                    continue;
                }
            }

            if !lifecycle.pause(self.item_delay).await {
                break;
            }
        }

        debug!("Armed {} candidate counters", armed.len());
        armed
    }
}
