//! In-memory platform for driving the monitor without touching real processes
#![allow(dead_code)]

use loadguard_daemon::config::Config;
use loadguard_daemon::platform::{LoadCounter, Platform, PriorityClass, ProcessRecord};
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct State {
    processes: Vec<ProcessRecord>,
    system_load: f64,
    name_loads: HashMap<String, f64>,
    broken_names: HashSet<String>,
    denied: HashSet<u32>,
    nice_floor: Option<i32>,
    armed: Vec<String>,
    set_calls: Vec<(u32, PriorityClass)>,
}

#[derive(Clone)]
pub struct FakePlatform {
    state: Arc<Mutex<State>>,
    cpus: usize,
}

pub struct FakeCounter {
    state: Arc<Mutex<State>>,
    name: Option<String>,
    reads: u32,
}

fn gone(what: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{} is gone", what))
}

impl LoadCounter for FakeCounter {
    fn read(&mut self) -> io::Result<f64> {
        self.reads += 1;
        let state = self.state.lock().unwrap();
        let value = match &self.name {
            None => state.system_load,
            Some(name) => {
                if !state.processes.iter().any(|p| &p.name == name) {
                    return Err(gone(name));
                }
                state.name_loads.get(name).copied().unwrap_or(0.0)
            }
        };
        // Cold read: nothing accumulated yet.
        Ok(if self.reads == 1 { 0.0 } else { value })
    }
}

impl FakePlatform {
    pub fn new(cpus: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            cpus,
        }
    }

    pub fn spawn(&self, pid: u32, name: &str, priority: PriorityClass) {
        self.state.lock().unwrap().processes.push(ProcessRecord {
            pid,
            name: name.to_string(),
            priority,
        });
    }

    pub fn exit(&self, pid: u32) {
        self.state.lock().unwrap().processes.retain(|p| p.pid != pid);
    }

    pub fn set_system_load(&self, percent: f64) {
        self.state.lock().unwrap().system_load = percent;
    }

    /// Raw aggregate reading for a name, before division by the cpu count.
    pub fn set_name_load(&self, name: &str, raw_percent: f64) {
        self.state
            .lock()
            .unwrap()
            .name_loads
            .insert(name.to_string(), raw_percent);
    }

    pub fn break_counter(&self, name: &str) {
        self.state.lock().unwrap().broken_names.insert(name.to_string());
    }

    /// Like an unprivileged RLIMIT_NICE: nice values below `floor` cannot be set.
    pub fn restrict_nice(&self, floor: i32) {
        self.state.lock().unwrap().nice_floor = Some(floor);
    }

    pub fn deny(&self, pid: u32) {
        self.state.lock().unwrap().denied.insert(pid);
    }

    pub fn priority_of(&self, pid: u32) -> Option<PriorityClass> {
        let state = self.state.lock().unwrap();
        state.processes.iter().find(|p| p.pid == pid).map(|p| p.priority)
    }

    pub fn armed(&self) -> Vec<String> {
        self.state.lock().unwrap().armed.clone()
    }

    pub fn set_calls(&self) -> Vec<(u32, PriorityClass)> {
        self.state.lock().unwrap().set_calls.clone()
    }
}

impl Platform for FakePlatform {
    type Counter = FakeCounter;

    fn system_counter(&self) -> io::Result<FakeCounter> {
        Ok(FakeCounter {
            state: Arc::clone(&self.state),
            name: None,
            reads: 0,
        })
    }

    fn process_counter(&self, name: &str) -> io::Result<FakeCounter> {
        let mut state = self.state.lock().unwrap();
        if state.broken_names.contains(name) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "access denied"));
        }
        if !state.processes.iter().any(|p| p.name == name) {
            return Err(gone(name));
        }
        state.armed.push(name.to_string());
        Ok(FakeCounter {
            state: Arc::clone(&self.state),
            name: Some(name.to_string()),
            reads: 0,
        })
    }

    fn list_processes(&self) -> io::Result<Vec<ProcessRecord>> {
        Ok(self.state.lock().unwrap().processes.clone())
    }

    fn priority(&self, pid: u32) -> io::Result<PriorityClass> {
        self.priority_of(pid).ok_or_else(|| gone(pid))
    }

    fn set_priority(&self, pid: u32, class: PriorityClass) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        let below_floor = state.nice_floor.is_some_and(|floor| class.nice() < floor);
        if state.denied.contains(&pid) || below_floor {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "not permitted"));
        }
        let process = state
            .processes
            .iter_mut()
            .find(|p| p.pid == pid)
            .ok_or_else(|| gone(pid))?;
        process.priority = class;
        state.set_calls.push((pid, class));
        Ok(())
    }

    fn can_restore(&self, original: PriorityClass) -> bool {
        let state = self.state.lock().unwrap();
        state.nice_floor.map_or(true, |floor| original.nice() >= floor)
    }

    fn logical_cpus(&self) -> usize {
        self.cpus
    }
}

/// Windows short enough that a full cycle takes a few milliseconds.
pub fn fast_config(max_cycles: Option<u64>) -> Config {
    let mut config = Config::default();
    config.sampling.system_window_ms = 5;
    config.sampling.settle_window_ms = 5;
    config.sampling.poll_slice_ms = 1;
    config.general.max_cycles = max_cycles;
    config.general.status_line = false;
    config
}

/// Four cpus, host at 60%, three instances of "A" using 40% of the host
/// between them, and one quiet "B".
pub fn busy_host() -> FakePlatform {
    let platform = FakePlatform::new(4);
    platform.set_system_load(60.0);
    for pid in [101, 102, 103] {
        platform.spawn(pid, "A", PriorityClass::NORMAL);
    }
    platform.set_name_load("A", 160.0);
    platform.spawn(200, "B", PriorityClass::NORMAL);
    platform.set_name_load("B", 20.0);
    platform
}
