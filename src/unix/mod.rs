//! Environment provider for Unix hosts, backed by `sysinfo` and procfs/sysfs.

use std::env;
use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use sysinfo::{Disks, System};

use crate::environment::{Environment, QueryResult};
use crate::error::QueryError;
use crate::signature::{BIOS_KEY, BIOS_VALUE};

const DMI_DIR: &str = "/sys/class/dmi/id";
const DMI_FIELDS: [&str; 4] = ["sys_vendor", "product_name", "bios_vendor", "bios_version"];

pub struct UnixEnvironment;

impl UnixEnvironment {
    pub fn new() -> Self {
        UnixEnvironment
    }
}

impl Default for UnixEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

/// `TracerPid` from a `/proc/<pid>/status` body.
fn parse_tracer_pid(status: &str) -> QueryResult<u32> {
    let line = status
        .lines()
        .find(|l| l.starts_with("TracerPid:"))
        .ok_or_else(|| QueryError::Malformed {
            facility: "/proc/self/status",
            detail: "no TracerPid line".to_string(),
        })?;

    line["TracerPid:".len()..]
        .trim()
        .parse()
        .map_err(|e: std::num::ParseIntError| QueryError::Malformed {
            facility: "/proc/self/status",
            detail: e.to_string(),
        })
}

/// Joins the DMI identification strings the way Windows exposes one BIOS
/// descriptor. Missing fields are skipped.
fn read_dmi_descriptor(dir: &Path) -> Option<String> {
    let parts: Vec<String> = DMI_FIELDS
        .iter()
        .filter_map(|f| fs::read_to_string(dir.join(f)).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

impl Environment for UnixEnvironment {
    fn uptime_seconds(&self) -> QueryResult<u64> {
        Ok(System::uptime())
    }

    fn logical_processor_count(&self) -> QueryResult<u32> {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        match sys.cpus().len() {
            0 => Err(QueryError::Malformed {
                facility: "cpu list",
                detail: "no processors reported".to_string(),
            }),
            n => Ok(n as u32),
        }
    }

    fn total_physical_memory_megabytes(&self) -> QueryResult<u64> {
        let mut sys = System::new();
        sys.refresh_memory();
        match sys.total_memory() {
            0 => Err(QueryError::Malformed {
                facility: "memory statistics",
                detail: "total memory reported as 0".to_string(),
            }),
            bytes => Ok(bytes / (1024 * 1024)),
        }
    }

    /// Capacity of the filesystem holding the working directory.
    fn total_disk_capacity_gigabytes(&self) -> QueryResult<u64> {
        let cwd = env::current_dir().map_err(|e| QueryError::io("current directory", e))?;
        let disks = Disks::new_with_refreshed_list();
        let disk = disks
            .list()
            .iter()
            .filter(|d| cwd.starts_with(d.mount_point()))
            .max_by_key(|d| d.mount_point().as_os_str().len())
            .ok_or_else(|| QueryError::Malformed {
                facility: "disk list",
                detail: format!("no disk is mounted above {}", cwd.display()),
            })?;

        Ok(disk.total_space() / (1024 * 1024 * 1024))
    }

    fn is_debugger_attached(&self) -> QueryResult<bool> {
        let status = fs::read_to_string("/proc/self/status")
            .map_err(|e| QueryError::io("/proc/self/status", e))?;

        Ok(parse_tracer_pid(&status)? != 0)
    }

    fn read_config_string(&self, key_path: &str, value_name: &str) -> QueryResult<Option<String>> {
        if key_path.eq_ignore_ascii_case(BIOS_KEY) && value_name == BIOS_VALUE {
            return Ok(read_dmi_descriptor(Path::new(DMI_DIR)));
        }

        Err(QueryError::Unsupported("registry"))
    }

    fn list_running_process_names(&self) -> QueryResult<Vec<String>> {
        let sys = System::new_all();

        Ok(sys
            .processes()
            .values()
            .map(|p| p.name().to_string_lossy().into_owned())
            .collect())
    }

    fn sleep_for(&self, duration: Duration) -> QueryResult<Duration> {
        let start = Instant::now();
        thread::sleep(duration);

        Ok(start.elapsed())
    }
}
