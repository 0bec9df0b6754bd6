//! The host facts probes are allowed to look at.

use std::time::Duration;

use crate::error::QueryError;

pub type QueryResult<T> = std::result::Result<T, QueryError>;

/// Read-only view of the host. Every query may fail independently.
pub trait Environment {
    fn uptime_seconds(&self) -> QueryResult<u64>;

    fn logical_processor_count(&self) -> QueryResult<u32>;

    fn total_physical_memory_megabytes(&self) -> QueryResult<u64>;

    fn total_disk_capacity_gigabytes(&self) -> QueryResult<u64>;

    fn is_debugger_attached(&self) -> QueryResult<bool>;

    /// `Ok(None)` when the key or value does not exist. An empty
    /// `value_name` asks only whether the key exists and yields `Some("")`.
    fn read_config_string(&self, key_path: &str, value_name: &str) -> QueryResult<Option<String>>;

    /// One snapshot of the running process names.
    fn list_running_process_names(&self) -> QueryResult<Vec<String>>;

    /// Blocks for `duration` and returns the time measured on a monotonic clock.
    fn sleep_for(&self, duration: Duration) -> QueryResult<Duration>;
}

/// The provider for the platform this was built for.
#[cfg(windows)]
pub fn host_environment() -> Box<dyn Environment> {
    Box::new(crate::windows::WindowsEnvironment::new())
}

#[cfg(unix)]
pub fn host_environment() -> Box<dyn Environment> {
    Box::new(crate::unix::UnixEnvironment::new())
}
