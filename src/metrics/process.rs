//! Default process metrics
//!
//! Values come from `/proc/self` and are simply absent on platforms without
//! procfs. Only the start time is always reported.

use std::time::{SystemTime, UNIX_EPOCH};

use metrics::{counter, gauge};

use super::names;

/// `USER_HZ`, the unit of the tick counters in `/proc/<pid>/stat`
const CLOCK_TICKS_PER_SECOND: f64 = 100.0;

pub struct ProcessCollector {
    start_time_seconds: f64,
}

#[derive(Debug, Default, Clone)]
pub struct ProcessSnapshot {
    pub start_time_seconds: f64,
    pub cpu: Option<CpuTime>,
    pub resident_memory_bytes: Option<f64>,
    pub virtual_memory_bytes: Option<f64>,
    pub threads: Option<f64>,
    pub open_fds: Option<f64>,
    pub max_fds: Option<f64>,
}

/// User and system CPU time in seconds
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuTime {
    pub user_seconds: f64,
    pub system_seconds: f64,
}

impl CpuTime {
    pub fn total_seconds(&self) -> f64 {
        self.user_seconds + self.system_seconds
    }
}

impl ProcessCollector {
    pub fn new() -> Self {
        let start_time_seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64().floor())
            .unwrap_or_default();
        Self { start_time_seconds }
    }

    pub fn collect(&self) -> ProcessSnapshot {
        let mut snapshot = ProcessSnapshot {
            start_time_seconds: self.start_time_seconds,
            ..Default::default()
        };

        if let Ok(stat) = std::fs::read_to_string("/proc/self/stat") {
            snapshot.cpu = cpu_time(&stat);
        }

        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            snapshot.resident_memory_bytes = status_kib(&status, "VmRSS").map(|kib| kib * 1024.0);
            snapshot.virtual_memory_bytes = status_kib(&status, "VmSize").map(|kib| kib * 1024.0);
            snapshot.threads = status_kib(&status, "Threads");
        }

        if let Ok(entries) = std::fs::read_dir("/proc/self/fd") {
            snapshot.open_fds = Some(entries.count() as f64);
        }

        if let Ok(limits) = std::fs::read_to_string("/proc/self/limits") {
            snapshot.max_fds = max_open_files(&limits);
        }

        snapshot
    }
}

impl Default for ProcessCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSnapshot {
    /// Write the snapshot into the current recorder
    pub fn publish(&self) {
        gauge!(names::PROCESS_START_TIME_SECONDS).set(self.start_time_seconds);

        // Counters only carry whole units; the kernel values never decrease
        if let Some(cpu) = self.cpu {
            counter!(names::PROCESS_CPU_USER_SECONDS_TOTAL).absolute(cpu.user_seconds as u64);
            counter!(names::PROCESS_CPU_SYSTEM_SECONDS_TOTAL).absolute(cpu.system_seconds as u64);
            counter!(names::PROCESS_CPU_SECONDS_TOTAL).absolute(cpu.total_seconds() as u64);
        }

        let optional = [
            (names::PROCESS_RESIDENT_MEMORY_BYTES, self.resident_memory_bytes),
            (names::PROCESS_VIRTUAL_MEMORY_BYTES, self.virtual_memory_bytes),
            (names::PROCESS_THREADS, self.threads),
            (names::PROCESS_OPEN_FDS, self.open_fds),
            (names::PROCESS_MAX_FDS, self.max_fds),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                gauge!(name).set(value);
            }
        }
    }
}

/// `utime` and `stime` (fields 14 and 15) of `/proc/<pid>/stat`
fn cpu_time(stat: &str) -> Option<CpuTime> {
    // The command name may contain spaces and parentheses; fields resume
    // after the last `)`, starting with field 3 (state).
    let (_, rest) = stat.rsplit_once(')')?;
    let mut fields = rest.split_whitespace().skip(11);
    let utime: f64 = fields.next()?.parse().ok()?;
    let stime: f64 = fields.next()?.parse().ok()?;
    Some(CpuTime {
        user_seconds: utime / CLOCK_TICKS_PER_SECOND,
        system_seconds: stime / CLOCK_TICKS_PER_SECOND,
    })
}

/// Numeric value of a `Key:   123 kB` line in `/proc/<pid>/status`
fn status_kib(status: &str, key: &str) -> Option<f64> {
    status.lines().find_map(|line| {
        let (name, rest) = line.split_once(':')?;
        if name != key {
            return None;
        }
        rest.split_whitespace().next()?.parse().ok()
    })
}

/// Soft limit from the `Max open files` row of `/proc/<pid>/limits`
fn max_open_files(limits: &str) -> Option<f64> {
    let row = limits.lines().find(|line| line.starts_with("Max open files"))?;
    let soft = row.trim_start_matches("Max open files").split_whitespace().next()?;
    soft.parse().ok()
}
