#![cfg(target_os = "linux")]

use loadguard_daemon::platform::{LinuxPlatform, LoadCounter, Platform, PriorityClass};
use std::io::ErrorKind;
use std::sync::mpsc;
use std::time::Duration;

fn own_name(platform: &LinuxPlatform) -> String {
    let pid = std::process::id();
    platform
        .list_processes()
        .unwrap()
        .into_iter()
        .find(|p| p.pid == pid)
        .map(|p| p.name)
        .expect("current process should be listed")
}

#[test]
fn test_list_processes_returns_current_process() {
    let platform = LinuxPlatform::new();
    let name = own_name(&platform);
    assert!(!name.is_empty());
}

#[test]
fn test_priority_of_current_process() {
    let platform = LinuxPlatform::new();
    let pid = std::process::id();
    let class = platform.priority(pid).unwrap();
    assert!((-20..=19).contains(&class.nice()));
    // Re-applying the current value needs no privilege.
    platform.set_priority(pid, class).unwrap();
    assert_eq!(platform.priority(pid).unwrap(), class);
}

#[test]
fn test_priority_of_invalid_pid_is_not_found() {
    let platform = LinuxPlatform::new();
    let err = platform.priority(999_999_999).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_system_counter_reports_a_percentage() {
    let platform = LinuxPlatform::new();
    let mut counter = platform.system_counter().unwrap();
    assert_eq!(counter.read().unwrap(), 0.0);
    std::thread::sleep(Duration::from_millis(50));
    let percent = counter.read().unwrap();
    assert!((0.0..=100.0).contains(&percent));
}

#[test]
fn test_process_counter_for_own_name() {
    let platform = LinuxPlatform::new();
    let mut counter = platform.process_counter(&own_name(&platform)).unwrap();
    counter.read().unwrap();
    let start = std::time::Instant::now();
    let mut spin = 0u64;
    while start.elapsed() < Duration::from_millis(50) {
        spin = spin.wrapping_add(1);
    }
    assert!(spin > 0);
    assert!(counter.read().unwrap() >= 0.0);
}

#[test]
fn test_process_counter_for_unknown_name_fails() {
    let platform = LinuxPlatform::new();
    let err = platform
        .process_counter("no-such-process-loadguard")
        .err()
        .expect("no process has this name");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_logical_cpus_is_positive() {
    assert!(LinuxPlatform::new().logical_cpus() >= 1);
}

#[test]
fn test_list_processes_skips_kernel_threads() {
    let platform = LinuxPlatform::new();
    let processes = platform.list_processes().unwrap();
    assert!(!processes.iter().any(|p| p.name == "kthreadd"));
}

#[test]
fn test_demotion_reaches_every_thread() {
    let platform = LinuxPlatform::new();
    let (tid_tx, tid_rx) = mpsc::channel();
    let (done_tx, done_rx) = mpsc::channel::<()>();
    let worker = std::thread::spawn(move || {
        let tid = unsafe { libc::syscall(libc::SYS_gettid) } as libc::id_t;
        tid_tx.send(tid).unwrap();
        let _ = done_rx.recv();
    });
    let tid = tid_rx.recv().unwrap();

    // Raising nice needs no privilege; this test binary simply stays at 19.
    let pid = std::process::id();
    platform.set_priority(pid, PriorityClass::IDLE).unwrap();
    let worker_nice = unsafe { libc::getpriority(libc::PRIO_PROCESS, tid) };

    done_tx.send(()).unwrap();
    worker.join().unwrap();
    assert_eq!(worker_nice, 19);
    assert_eq!(platform.priority(pid).unwrap(), PriorityClass::IDLE);
}

#[test]
fn test_set_priority_of_exited_process_is_not_found() {
    let platform = LinuxPlatform::new();
    let err = platform
        .set_priority(999_999_999, PriorityClass::IDLE)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_idle_is_always_restorable() {
    assert!(LinuxPlatform::new().can_restore(PriorityClass::IDLE));
}
