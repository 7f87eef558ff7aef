use super::{LoadCounter, Platform, PriorityClass, ProcessRecord};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::time::Instant;
use tracing::debug;

/// PF_KTHREAD in the per-task flags word.
const PF_KTHREAD: u64 = 0x0020_0000;

struct StatLine {
    name: String,
    total_ticks: u64, // utime + stime
    nice: i32,
    kernel_thread: bool,
}

/// Parse `/proc/<pid>/stat`. The name may itself contain spaces and parentheses,
/// so fields are counted from the last `)`.
fn parse_stat(content: &str) -> Option<StatLine> {
    let open = content.find('(')?;
    let close = content.rfind(')')?;
    let name = content.get(open + 1..close)?.to_string();
    let rest: Vec<&str> = content.get(close + 1..)?.split_whitespace().collect();
    if rest.len() < 17 {
        return None;
    }
    let flags: u64 = rest[6].parse().ok()?;
    let utime: u64 = rest[11].parse().ok()?;
    let stime: u64 = rest[12].parse().ok()?;
    let nice: i32 = rest[16].parse().ok()?;
    Some(StatLine {
        name,
        total_ticks: utime + stime,
        nice,
        kernel_thread: flags & PF_KTHREAD != 0,
    })
}

fn read_stat(pid: u32) -> io::Result<StatLine> {
    let content = fs::read_to_string(format!("/proc/{}/stat", pid))?;
    parse_stat(&content).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("malformed /proc/{}/stat", pid),
        )
    })
}

fn live_pids() -> io::Result<Vec<u32>> {
    let mut pids = Vec::new();
    for entry in fs::read_dir("/proc")?.flatten() {
        if let Some(pid) = entry.file_name().to_str().and_then(|n| n.parse::<u32>().ok()) {
            pids.push(pid);
        }
    }
    Ok(pids)
}

fn ticks_by_name(name: &str) -> io::Result<HashMap<u32, u64>> {
    let mut ticks = HashMap::new();
    for pid in live_pids()? {
        // Processes exit while we walk /proc; those reads simply fail.
        if let Some(stat) = read_user_stat(pid) {
            if stat.name == name {
                ticks.insert(pid, stat.total_ticks);
            }
        }
    }
    Ok(ticks)
}

fn no_instance(name: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no live process named {:?}", name),
    )
}

/// User-space processes only; kernel threads are never candidates.
fn read_user_stat(pid: u32) -> Option<StatLine> {
    read_stat(pid).ok().filter(|stat| !stat.kernel_thread)
}

fn task_ids(pid: u32) -> io::Result<Vec<u32>> {
    let mut tids = Vec::new();
    for entry in fs::read_dir(format!("/proc/{}/task", pid))?.flatten() {
        if let Some(tid) = entry.file_name().to_str().and_then(|n| n.parse::<u32>().ok()) {
            tids.push(tid);
        }
    }
    Ok(tids)
}

/// ESRCH is how the priority calls report a vanished process.
fn last_os_error() -> io::Error {
    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        Some(libc::ESRCH) => io::Error::new(io::ErrorKind::NotFound, err),
        _ => err,
    }
}

#[derive(Clone, Copy)]
struct CpuTimes {
    busy: u64,
    total: u64,
}

fn read_cpu_times() -> io::Result<CpuTimes> {
    let stat = fs::read_to_string("/proc/stat")?;
    let line = stat
        .lines()
        .find(|l| l.starts_with("cpu "))
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "no aggregate cpu line"))?;
    // user nice system idle iowait irq softirq steal; guest time is already in user
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .take(8)
        .map(|v| v.parse().unwrap_or(0))
        .collect();
    let total: u64 = fields.iter().sum();
    let idle = fields.get(3).copied().unwrap_or(0) + fields.get(4).copied().unwrap_or(0);
    Ok(CpuTimes {
        busy: total.saturating_sub(idle),
        total,
    })
}

struct TickSample {
    taken: Instant,
    ticks: HashMap<u32, u64>,
}

enum Source {
    System {
        last: Option<CpuTimes>,
    },
    Process {
        name: String,
        clock_ticks: u64,
        last: Option<TickSample>,
    },
}

pub struct LinuxCounter {
    source: Source,
}

impl LoadCounter for LinuxCounter {
    fn read(&mut self) -> io::Result<f64> {
        match &mut self.source {
            Source::System { last } => {
                let now = read_cpu_times()?;
                let percent = match last.replace(now) {
                    Some(prev) => {
                        let total = now.total.saturating_sub(prev.total);
                        let busy = now.busy.saturating_sub(prev.busy);
                        if total > 0 {
                            busy as f64 / total as f64 * 100.0
                        } else {
                            0.0
                        }
                    }
                    None => 0.0,
                };
                Ok(percent)
            }
            Source::Process {
                name,
                clock_ticks,
                last,
            } => {
                let taken = Instant::now();
                let ticks = ticks_by_name(name)?;
                if ticks.is_empty() {
                    return Err(no_instance(name));
                }
                let percent = match last.take() {
                    Some(prev) => {
                        // Only instances seen at both reads contribute a delta.
                        let delta: u64 = ticks
                            .iter()
                            .filter_map(|(pid, now)| {
                                prev.ticks.get(pid).map(|before| now.saturating_sub(*before))
                            })
                            .sum();
                        let elapsed = taken.duration_since(prev.taken).as_secs_f64();
                        if elapsed > 0.0 {
                            let cpu_seconds = delta as f64 / *clock_ticks as f64;
                            (cpu_seconds / elapsed) * 100.0
                        } else {
                            0.0
                        }
                    }
                    None => 0.0,
                };
                *last = Some(TickSample { taken, ticks });
                Ok(percent)
            }
        }
    }
}

pub struct LinuxPlatform {
    clock_ticks: u64,
    num_cpus: usize,
}

impl LinuxPlatform {
    pub fn new() -> Self {
        let clock_ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) as u64 }.max(1);
        let num_cpus = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) }.max(1) as usize;
        Self {
            clock_ticks,
            num_cpus,
        }
    }

    /// Lowering a nice value (which restoration does) needs CAP_SYS_NICE.
    pub fn is_privileged() -> bool {
        unsafe { libc::geteuid() == 0 }
    }

    /// Lowest nice value this process may set without privilege, from RLIMIT_NICE.
    fn nice_floor() -> Option<i32> {
        let mut limit = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        if unsafe { libc::getrlimit(libc::RLIMIT_NICE, &mut limit) } != 0 {
            return None;
        }
        if limit.rlim_cur == libc::RLIM_INFINITY {
            return Some(-20);
        }
        // The limit is expressed as 20 - nice, in [1, 40].
        Some(20 - limit.rlim_cur.min(40) as i32)
    }
}

impl Default for LinuxPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for LinuxPlatform {
    type Counter = LinuxCounter;

    fn system_counter(&self) -> io::Result<LinuxCounter> {
        read_cpu_times()?;
        Ok(LinuxCounter {
            source: Source::System { last: None },
        })
    }

    fn process_counter(&self, name: &str) -> io::Result<LinuxCounter> {
        if ticks_by_name(name)?.is_empty() {
            return Err(no_instance(name));
        }
        Ok(LinuxCounter {
            source: Source::Process {
                name: name.to_string(),
                clock_ticks: self.clock_ticks,
                last: None,
            },
        })
    }

    fn list_processes(&self) -> io::Result<Vec<ProcessRecord>> {
        let mut processes = Vec::new();
        for pid in live_pids()? {
            if let Some(stat) = read_user_stat(pid) {
                processes.push(ProcessRecord {
                    pid,
                    name: stat.name,
                    priority: PriorityClass::from_nice(stat.nice),
                });
            }
        }
        Ok(processes)
    }

    fn priority(&self, pid: u32) -> io::Result<PriorityClass> {
        // -1 is a valid nice value, so errno is the only error signal.
        unsafe {
            *libc::__errno_location() = 0;
        }
        let nice = unsafe { libc::getpriority(libc::PRIO_PROCESS, pid as libc::id_t) };
        if nice == -1 && io::Error::last_os_error().raw_os_error().unwrap_or(0) != 0 {
            return Err(last_os_error());
        }
        Ok(PriorityClass::from_nice(nice))
    }

    /// Linux applies nice per thread, so every task of the process is set.
    ///
    /// Threads that exit meanwhile are skipped. Fails only if no thread could
    /// be set.
    fn set_priority(&self, pid: u32, class: PriorityClass) -> io::Result<()> {
        // The whole task directory is gone only once the process has exited.
        let tids = task_ids(pid)?;
        let mut applied = 0;
        let mut first_error = None;
        for tid in tids {
            let result =
                unsafe { libc::setpriority(libc::PRIO_PROCESS, tid as libc::id_t, class.nice()) };
            if result == 0 {
                applied += 1;
                continue;
            }
            let err = last_os_error();
            if err.kind() == io::ErrorKind::NotFound {
                continue;
            }
            debug!(pid, tid, "Failed to set thread priority: {}", err);
            if first_error.is_none() {
                first_error = Some(err);
            }
        }
        if applied > 0 {
            return Ok(());
        }
        Err(first_error.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("process {} has exited", pid))
        }))
    }

    fn can_restore(&self, original: PriorityClass) -> bool {
        if Self::is_privileged() {
            return true;
        }
        Self::nice_floor().is_some_and(|floor| original.nice() >= floor)
    }

    fn logical_cpus(&self) -> usize {
        self.num_cpus
    }
}
