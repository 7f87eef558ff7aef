//! Aggregate host CPU utilization, sampled once per cycle

use crate::lifecycle::Lifecycle;
use crate::platform::{LoadCounter, Platform};
use std::time::{Duration, SystemTime};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadSample {
    pub taken_at: SystemTime,
    pub percent: f64,
}

impl LoadSample {
    pub fn new(percent: f64) -> Self {
        Self {
            taken_at: SystemTime::now(),
            percent: percent.clamp(0.0, 100.0),
        }
    }
}

pub struct SystemLoadSampler {
    window: Duration,
    threshold_percent: f64,
}

impl SystemLoadSampler {
    pub fn new(window: Duration, threshold_percent: f64) -> Self {
        Self {
            window,
            threshold_percent,
        }
    }

    /// Take a fresh measurement over one sampling window.
    ///
    /// Returns `None` if the counter is unavailable or the wait was interrupted.
    pub async fn sample<P: Platform>(
        &self,
        platform: &P,
        lifecycle: &Lifecycle,
    ) -> Option<LoadSample> {
        let mut counter = match platform.system_counter() {
            Ok(counter) => counter,
            Err(e) => {
                debug!("System counter unavailable: {}", e);
                return None;
            }
        };
        if let Err(e) = counter.read() {
            debug!("System counter cold read failed: {}", e);
            return None;
        }
        if !lifecycle.pause(self.window).await {
            return None;
        }
        match counter.read() {
            Ok(percent) => {
                let sample = LoadSample::new(percent);
                trace!(percent = sample.percent, "system load");
                Some(sample)
            }
            Err(e) => {
                debug!("System counter read failed: {}", e);
                None
            }
        }
    }

    /// Below the threshold the cycle has nothing to do.
    pub fn is_busy(&self, sample: &LoadSample) -> bool {
        sample.percent >= self.threshold_percent
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
