//! Probes that compare one host scalar against one limit.

use tracing::debug;

use super::{Observation, Probe, ProbeResult};
use crate::config::Thresholds;
use crate::environment::Environment;

pub struct UptimeProbe {
    threshold_seconds: u64,
}

impl UptimeProbe {
    pub fn new(thresholds: &Thresholds) -> Self {
        UptimeProbe {
            threshold_seconds: thresholds.uptime_threshold_seconds,
        }
    }
}

impl Probe for UptimeProbe {
    fn name(&self) -> &'static str {
        "System uptime"
    }

    fn run(&self, env: &dyn Environment) -> ProbeResult {
        let mut obs = Observation::new(self.name());
        match env.uptime_seconds() {
            Ok(uptime) => {
                debug!(uptime, "uptime");
                obs.fact(format!("System uptime: {} seconds", uptime));
                if uptime < self.threshold_seconds {
                    obs.warn(format!(
                        "Low system uptime (< {} s). Possible sandbox",
                        self.threshold_seconds
                    ));
                }
            }
            Err(err) => obs.query_failed(&err),
        }

        obs.into()
    }
}

pub struct ProcessorProbe {
    threshold: u32,
}

impl ProcessorProbe {
    pub fn new(thresholds: &Thresholds) -> Self {
        ProcessorProbe {
            threshold: thresholds.processor_threshold,
        }
    }
}

impl Probe for ProcessorProbe {
    fn name(&self) -> &'static str {
        "Processor count"
    }

    fn run(&self, env: &dyn Environment) -> ProbeResult {
        let mut obs = Observation::new(self.name());
        match env.logical_processor_count() {
            Ok(count) => {
                debug!(count, "logical processors");
                obs.fact(format!("Number of processors: {}", count));
                if count <= self.threshold {
                    obs.warn(format!("Only {} processor(s) detected. Possible sandbox", count));
                }
            }
            Err(err) => obs.query_failed(&err),
        }

        obs.into()
    }
}

pub struct MemoryProbe {
    threshold_mb: u64,
}

impl MemoryProbe {
    pub fn new(thresholds: &Thresholds) -> Self {
        MemoryProbe {
            threshold_mb: thresholds.memory_threshold_mb,
        }
    }
}

impl Probe for MemoryProbe {
    fn name(&self) -> &'static str {
        "Physical memory"
    }

    fn run(&self, env: &dyn Environment) -> ProbeResult {
        let mut obs = Observation::new(self.name());
        match env.total_physical_memory_megabytes() {
            Ok(mb) => {
                debug!(mb, "physical memory");
                obs.fact(format!("Total memory: {} MB", mb));
                if mb < self.threshold_mb {
                    obs.warn(format!("Low memory (< {} MB). Possible sandbox", self.threshold_mb));
                }
            }
            Err(err) => obs.query_failed(&err),
        }

        obs.into()
    }
}

pub struct DiskProbe {
    threshold_gb: u64,
}

impl DiskProbe {
    pub fn new(thresholds: &Thresholds) -> Self {
        DiskProbe {
            threshold_gb: thresholds.disk_threshold_gb,
        }
    }
}

impl Probe for DiskProbe {
    fn name(&self) -> &'static str {
        "Disk size"
    }

    fn run(&self, env: &dyn Environment) -> ProbeResult {
        let mut obs = Observation::new(self.name());
        match env.total_disk_capacity_gigabytes() {
            Ok(gb) => {
                debug!(gb, "disk capacity");
                obs.fact(format!("Total disk size: {} GB", gb));
                if gb < self.threshold_gb {
                    obs.warn(format!(
                        "Very small disk size (< {} GB). Possible sandbox",
                        self.threshold_gb
                    ));
                }
            }
            Err(err) => obs.query_failed(&err),
        }

        obs.into()
    }
}

pub struct DebuggerProbe;

impl Probe for DebuggerProbe {
    fn name(&self) -> &'static str {
        "Debugger"
    }

    fn run(&self, env: &dyn Environment) -> ProbeResult {
        let mut obs = Observation::new(self.name());
        match env.is_debugger_attached() {
            Ok(attached) => {
                debug!(attached, "debugger");
                obs.fact(format!("Debugger attached: {}", if attached { "yes" } else { "no" }));
                if attached {
                    obs.warn("Debugger detected. Possible sandbox");
                }
            }
            Err(err) => obs.query_failed(&err),
        }

        obs.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::fake::FakeEnvironment;
    use crate::probe::Indicator;

    fn thresholds() -> Thresholds {
        Thresholds::default()
    }

    fn env() -> FakeEnvironment {
        FakeEnvironment::normal()
    }

    #[test]
    fn test_uptime_boundary() {
        let probe = UptimeProbe::new(&thresholds());
        let mut e = env();

        e.uptime = Some(299);
        assert_eq!(probe.run(&e).indicator, Indicator::Suspicious);
        e.uptime = Some(300);
        assert_eq!(probe.run(&e).indicator, Indicator::Clean);
    }

    #[test]
    fn test_processor_boundary() {
        let probe = ProcessorProbe::new(&thresholds());
        let mut e = env();

        e.processors = Some(1);
        assert_eq!(probe.run(&e).indicator, Indicator::Suspicious);
        e.processors = Some(2);
        assert_eq!(probe.run(&e).indicator, Indicator::Clean);
    }

    #[test]
    fn test_memory_boundary() {
        let probe = MemoryProbe::new(&thresholds());
        let mut e = env();

        e.memory_mb = Some(511);
        assert_eq!(probe.run(&e).indicator, Indicator::Suspicious);
        e.memory_mb = Some(512);
        assert_eq!(probe.run(&e).indicator, Indicator::Clean);
    }

    #[test]
    fn test_disk_boundary() {
        let probe = DiskProbe::new(&thresholds());
        let mut e = env();

        e.disk_gb = Some(9);
        assert_eq!(probe.run(&e).indicator, Indicator::Suspicious);
        e.disk_gb = Some(10);
        assert_eq!(probe.run(&e).indicator, Indicator::Clean);
    }

    #[test]
    fn test_debugger() {
        let mut e = env();
        assert_eq!(DebuggerProbe.run(&e).indicator, Indicator::Clean);

        e.debugger = Some(true);
        let result = DebuggerProbe.run(&e);
        assert_eq!(result.indicator, Indicator::Suspicious);
        assert_eq!(result.observation.warnings.len(), 1);
    }

    #[test]
    fn test_custom_threshold() {
        let t = Thresholds {
            memory_threshold_mb: 4096,
            ..Thresholds::default()
        };
        let mut e = env();
        e.memory_mb = Some(2048);
        assert_eq!(MemoryProbe::new(&t).run(&e).indicator, Indicator::Suspicious);
    }

    #[test]
    fn test_failed_queries_are_clean() {
        let e = FakeEnvironment::default();
        let t = thresholds();
        let probes: Vec<Box<dyn Probe>> = vec![
            Box::new(UptimeProbe::new(&t)),
            Box::new(ProcessorProbe::new(&t)),
            Box::new(MemoryProbe::new(&t)),
            Box::new(DiskProbe::new(&t)),
            Box::new(DebuggerProbe),
        ];

        for p in &probes {
            let result = p.run(&e);
            assert_eq!(result.indicator, Indicator::Clean, "{}", p.name());
            assert!(result.observation.facts.is_empty());
            assert_eq!(result.observation.query_errors.len(), 1);
        }
    }
}
