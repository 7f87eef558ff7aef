//! Host capabilities the monitor needs: process listing, CPU counters, priorities

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "linux")]
pub use linux::LinuxPlatform;

use std::fmt;
use std::io;

/// A scheduling tier, stored as the exact nice value so it can be put back as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PriorityClass(i32);

impl PriorityClass {
    pub const IDLE: PriorityClass = PriorityClass(19);
    pub const NORMAL: PriorityClass = PriorityClass(0);

    pub fn from_nice(nice: i32) -> Self {
        PriorityClass(nice.clamp(-20, 19))
    }

    pub fn nice(self) -> i32 {
        self.0
    }

    pub fn is_idle(self) -> bool {
        self.0 >= Self::IDLE.0
    }

    pub fn tier(self) -> &'static str {
        match self.0 {
            19 => "idle",
            1..=18 => "below_normal",
            0 => "normal",
            -9..=-1 => "above_normal",
            _ => "high",
        }
    }
}

impl fmt::Display for PriorityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (nice {})", self.tier(), self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    pub pid: u32,
    pub name: String,
    pub priority: PriorityClass,
}

/// A differential CPU measurement.
///
/// Each read reports work done since the previous read, so the first read
/// after creation only establishes a baseline and must be discarded.
pub trait LoadCounter: Send {
    fn read(&mut self) -> io::Result<f64>;
}

pub trait Platform: Send + Sync {
    type Counter: LoadCounter;

    /// Counter over aggregate host utilization, in percent of total capacity.
    fn system_counter(&self) -> io::Result<Self::Counter>;

    /// Counter over every live process with this image name, in percent of one
    /// logical processor (may exceed 100).
    fn process_counter(&self, name: &str) -> io::Result<Self::Counter>;

    fn list_processes(&self) -> io::Result<Vec<ProcessRecord>>;

    fn priority(&self, pid: u32) -> io::Result<PriorityClass>;

    fn set_priority(&self, pid: u32, class: PriorityClass) -> io::Result<()>;

    /// Whether a process demoted now could later be put back at `original`.
    fn can_restore(&self, original: PriorityClass) -> bool;

    fn logical_cpus(&self) -> usize;
}
