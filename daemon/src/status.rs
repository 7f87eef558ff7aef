//! Console output: startup banner and a status line rewritten in place

use crate::monitor::{CycleOutcome, RunSummary};
use std::io::{self, IsTerminal, Write};

pub fn banner() -> String {
    format!(
        "{} v{}\nCopyright (c) {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_AUTHORS").replace(':', ", ")
    )
}

pub fn describe(outcome: &CycleOutcome, previous_tracked: usize) -> String {
    match outcome {
        CycleOutcome::Idle(sample) => format!(
            "CPU {:5.1}% | idle | {} process(es) throttled",
            sample.percent, previous_tracked
        ),
        CycleOutcome::Throttled {
            sample,
            hot_names,
            tracked,
            ..
        } => format!(
            "CPU {:5.1}% | busy, {} hot name(s) | {} process(es) throttled",
            sample.percent, hot_names, tracked
        ),
        CycleOutcome::Unavailable => format!(
            "CPU   n/a  | waiting | {} process(es) throttled",
            previous_tracked
        ),
        CycleOutcome::Interrupted => "Stopping, restoring priorities...".to_string(),
    }
}

pub struct StatusLine {
    enabled: bool,
    width: usize,
    tracked: usize,
}

impl StatusLine {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: enabled && io::stdout().is_terminal(),
            width: 0,
            tracked: 0,
        }
    }

    pub fn show(&mut self, outcome: &CycleOutcome) {
        if let CycleOutcome::Throttled { tracked, .. } = outcome {
            self.tracked = *tracked;
        }
        if !self.enabled {
            return;
        }
        let text = describe(outcome, self.tracked);
        let pad = self.width.saturating_sub(text.len());
        self.width = text.len();
        let mut out = io::stdout().lock();
        let _ = write!(out, "\r{}{}", text, " ".repeat(pad));
        let _ = out.flush();
    }

    pub fn finish(&mut self, summary: &RunSummary) {
        if self.enabled && self.width > 0 {
            println!();
        }
        println!(
            "Stopped after {} cycle(s); restored {} process(es).",
            summary.cycles, summary.restoration.restored
        );
    }
}
