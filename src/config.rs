//! Thresholds and signatures handed to the engine at construction.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::signature::Signatures;

pub const UPTIME_THRESHOLD_SECONDS: u64 = 300;
pub const PROCESSOR_THRESHOLD: u32 = 1;
pub const MEMORY_THRESHOLD_MB: u64 = 512;
pub const DISK_THRESHOLD_GB: u64 = 10;
pub const SLEEP_NOMINAL_MS: u64 = 5000;
pub const SLEEP_TOLERANCE_PERCENT: u32 = 90;
/// Longest sleep a config may request, ten minutes
pub const MAX_SLEEP_NOMINAL_MS: u64 = 600_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Suspicious below this many seconds since boot
    pub uptime_threshold_seconds: u64,
    /// Suspicious at or below this many logical processors
    pub processor_threshold: u32,
    /// Suspicious below this much physical memory
    pub memory_threshold_mb: u64,
    /// Suspicious below this disk capacity
    pub disk_threshold_gb: u64,
    pub sleep_nominal_ms: u64,
    /// Share of the nominal sleep that must actually elapse
    pub sleep_tolerance_percent: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            uptime_threshold_seconds: UPTIME_THRESHOLD_SECONDS,
            processor_threshold: PROCESSOR_THRESHOLD,
            memory_threshold_mb: MEMORY_THRESHOLD_MB,
            disk_threshold_gb: DISK_THRESHOLD_GB,
            sleep_nominal_ms: SLEEP_NOMINAL_MS,
            sleep_tolerance_percent: SLEEP_TOLERANCE_PERCENT,
        }
    }
}

impl Thresholds {
    pub fn sleep_nominal(&self) -> Duration {
        Duration::from_millis(self.sleep_nominal_ms)
    }

    /// Shortest elapsed time that still counts as a real sleep. `None` when
    /// the product does not fit in a `Duration`.
    pub fn sleep_minimum(&self) -> Option<Duration> {
        self.sleep_nominal()
            .checked_mul(self.sleep_tolerance_percent)
            .map(|d| d / 100)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_SLEEP_NOMINAL_MS).contains(&self.sleep_nominal_ms) {
            return Err(Error::ConfigInvalid(format!(
                "sleep_nominal_ms must be between 1 and {}, got {}",
                MAX_SLEEP_NOMINAL_MS, self.sleep_nominal_ms
            )));
        }
        if !(1..=100).contains(&self.sleep_tolerance_percent) {
            return Err(Error::ConfigInvalid(format!(
                "sleep_tolerance_percent must be between 1 and 100, got {}",
                self.sleep_tolerance_percent
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub thresholds: Thresholds,
    pub signatures: Signatures,
}

impl Config {
    /// Parse and validate a JSON config.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text)?;
        config.thresholds.validate()?;

        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_json(&text)
    }
}
