//! The sampling / scan / evaluate / throttle cycle and its shutdown path

use crate::config::Config;
use crate::evaluator::ProcessLoadEvaluator;
use crate::ledger::PriorityLedger;
use crate::lifecycle::Lifecycle;
use crate::platform::Platform;
use crate::restore::{RestorationManager, RestoreSummary};
use crate::sampler::{LoadSample, SystemLoadSampler};
use crate::scanner::CandidateScanner;
use crate::throttle::PriorityThrottleController;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Host load under the threshold; nothing was scanned.
    Idle(LoadSample),
    Throttled {
        sample: LoadSample,
        hot_names: usize,
        demoted: usize,
        tracked: usize,
    },
    /// The system counter could not be read this cycle.
    Unavailable,
    Interrupted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub interrupted: bool,
    pub restoration: RestoreSummary,
}

pub struct Monitor<P: Platform> {
    platform: Arc<P>,
    lifecycle: Lifecycle,
    ledger: PriorityLedger,
    sampler: SystemLoadSampler,
    scanner: CandidateScanner,
    evaluator: ProcessLoadEvaluator,
    max_cycles: Option<u64>,
}

impl<P: Platform> Monitor<P> {
    pub fn new(platform: Arc<P>, config: &Config, lifecycle: Lifecycle) -> Self {
        let threshold = config.throttle.threshold_percent;
        Self {
            platform,
            lifecycle,
            ledger: PriorityLedger::new(),
            sampler: SystemLoadSampler::new(config.sampling.system_window(), threshold),
            scanner: CandidateScanner::new(config.sampling.poll_slice()),
            evaluator: ProcessLoadEvaluator::new(config.sampling.settle_window(), threshold),
            max_cycles: config.general.max_cycles,
        }
    }

    pub fn ledger(&self) -> &PriorityLedger {
        &self.ledger
    }

    /// Cycle until interrupted (or `max_cycles` is reached), then restore every
    /// demoted process and move the lifecycle to `Stop`.
    pub async fn run<F>(mut self, mut on_cycle: F) -> RunSummary
    where
        F: FnMut(&CycleOutcome),
    {
        info!("Monitor started");
        let mut cycles = 0;
        while self.lifecycle.is_running() && self.max_cycles.map_or(true, |max| cycles < max) {
            let outcome = self.cycle().await;
            cycles += 1;
            on_cycle(&outcome);
            if outcome == CycleOutcome::Unavailable {
                self.lifecycle.pause(self.sampler.window()).await;
            }
        }
        let interrupted = !self.lifecycle.is_running();

        let restoration = RestorationManager::restore_all(&*self.platform, &mut self.ledger);
        self.lifecycle.finish();
        info!(cycles, interrupted, "Monitor stopped");
        RunSummary {
            cycles,
            interrupted,
            restoration,
        }
    }

    pub async fn cycle(&mut self) -> CycleOutcome {
        let platform = &*self.platform;

        let Some(sample) = self.sampler.sample(platform, &self.lifecycle).await else {
            return self.interrupted_or(CycleOutcome::Unavailable);
        };
        if !self.sampler.is_busy(&sample) {
            debug!(load = sample.percent, "Host not busy, skipping scan");
            return CycleOutcome::Idle(sample);
        }

        let armed = self.scanner.scan(platform, &self.lifecycle).await;
        if !self.lifecycle.is_running() {
            return CycleOutcome::Interrupted;
        }

        let hot = self.evaluator.evaluate(platform, &self.lifecycle, armed).await;
        if !self.lifecycle.is_running() {
            return CycleOutcome::Interrupted;
        }

        let pids = hot.iter().flat_map(|h| h.pids.iter().copied());
        let demoted = PriorityThrottleController::demote_all(platform, &mut self.ledger, pids);
        CycleOutcome::Throttled {
            sample,
            hot_names: hot.len(),
            demoted,
            tracked: self.ledger.len(),
        }
    }

    fn interrupted_or(&self, outcome: CycleOutcome) -> CycleOutcome {
        if self.lifecycle.is_running() {
            outcome
        } else {
            CycleOutcome::Interrupted
        }
    }
}
