//! Original priority of every process this run has demoted

use crate::platform::PriorityClass;
use std::collections::HashMap;

/// Maps a demoted pid to the priority it had before its first demotion.
///
/// Owned by the monitor loop; nothing else touches it.
#[derive(Debug, Default)]
pub struct PriorityLedger {
    entries: HashMap<u32, PriorityClass>,
}

impl PriorityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `original` for `pid` unless it is already tracked.
    ///
    /// Returns true if this call added the entry. An existing entry is never
    /// overwritten.
    pub fn record(&mut self, pid: u32, original: PriorityClass) -> bool {
        if self.entries.contains_key(&pid) {
            return false;
        }
        self.entries.insert(pid, original);
        true
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.entries.contains_key(&pid)
    }

    pub fn original(&self, pid: u32) -> Option<PriorityClass> {
        self.entries.get(&pid).copied()
    }

    /// Only a successful restoration removes an entry.
    pub(crate) fn remove(&mut self, pid: u32) -> Option<PriorityClass> {
        self.entries.remove(&pid)
    }

    pub fn entries(&self) -> Vec<(u32, PriorityClass)> {
        let mut entries: Vec<_> = self.entries.iter().map(|(pid, class)| (*pid, *class)).collect();
        entries.sort_by_key(|(pid, _)| *pid);
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
