//! Settles armed counters and picks out the processes using too much CPU

use crate::lifecycle::Lifecycle;
use crate::platform::{LoadCounter, Platform};
use crate::scanner::ArmedCounters;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// A process name over the share threshold and its instances alive right now.
#[derive(Debug, Clone, PartialEq)]
pub struct HotName {
    pub name: String,
    pub share_percent: f64,
    pub pids: Vec<u32>,
}

pub struct ProcessLoadEvaluator {
    settle_window: Duration,
    threshold_percent: f64,
}

impl ProcessLoadEvaluator {
    pub fn new(settle_window: Duration, threshold_percent: f64) -> Self {
        Self {
            settle_window,
            threshold_percent,
        }
    }

    /// Raw per-name readings cover all cores, so divide by the processor count
    /// to get a share of the whole host.
    pub fn normalize(raw_percent: f64, logical_cpus: usize) -> f64 {
        raw_percent / logical_cpus.max(1) as f64
    }

    pub async fn evaluate<P: Platform>(
        &self,
        platform: &P,
        lifecycle: &Lifecycle,
        armed: ArmedCounters<P::Counter>,
    ) -> Vec<HotName> {
        if armed.is_empty() || !lifecycle.pause(self.settle_window).await {
            return Vec::new();
        }

        let cpus = platform.logical_cpus();
        let mut over: Vec<(String, f64)> = Vec::new();
        for (name, mut counter) in armed {
            match counter.read() {
                Ok(raw) => {
                    let share = Self::normalize(raw, cpus);
                    if share >= self.threshold_percent {
                        debug!(name = %name, share, "over threshold");
                        over.push((name, share));
                    }
                }
                Err(e) => debug!(name = %name, "Dropping counter: {}", e),
            }
        }
        if over.is_empty() {
            return Vec::new();
        }

        // Instances may have come and gone since the scan.
        let mut live: HashMap<String, Vec<u32>> = HashMap::new();
        match platform.list_processes() {
            Ok(processes) => {
                for process in processes {
                    live.entry(process.name).or_default().push(process.pid);
                }
            }
            Err(e) => {
                warn!("Failed to list processes: {}", e);
                return Vec::new();
            }
        }

        over.into_iter()
            .map(|(name, share_percent)| {
                let pids = live.remove(&name).unwrap_or_default();
                HotName {
                    name,
                    share_percent,
                    pids,
                }
            })
            .collect()
    }
}
