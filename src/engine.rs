//! Runs every probe and folds the indicators into one verdict.

use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::environment::Environment;
use crate::probe::{
    DebuggerProbe, DiskProbe, MemoryProbe, Probe, ProbeResult, ProcessProbe, ProcessorProbe,
    SleepTimingProbe, UptimeProbe, VirtualMachineProbe,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    SandboxLikely,
    Normal,
}

impl Verdict {
    pub fn from_suspicious_count(count: usize) -> Self {
        if count >= 1 {
            Verdict::SandboxLikely
        } else {
            Verdict::Normal
        }
    }
}

/// Results of one run, in registry order.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub results: Vec<ProbeResult>,
    pub suspicious_count: usize,
    pub verdict: Verdict,
}

/// Run each probe once, in order, with no early exit.
///
/// Probes run one after another on the calling thread; the sleep timing probe
/// is only meaningful when nothing else is running.
pub fn evaluate(registry: &[Box<dyn Probe>], env: &dyn Environment) -> Report {
    let mut results = Vec::with_capacity(registry.len());
    for probe in registry {
        debug!(probe = probe.name(), "running probe");
        let result = probe.run(env);
        debug!(probe = probe.name(), indicator = ?result.indicator, "probe finished");
        results.push(result);
    }

    let suspicious_count = results
        .iter()
        .filter(|r| r.indicator.is_suspicious())
        .count();
    let verdict = Verdict::from_suspicious_count(suspicious_count);
    info!(suspicious_count, ?verdict, "scan complete");

    Report {
        results,
        suspicious_count,
        verdict,
    }
}

pub struct Engine {
    registry: Vec<Box<dyn Probe>>,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        let t = &config.thresholds;
        let s = &config.signatures;
        let registry: Vec<Box<dyn Probe>> = vec![
            Box::new(UptimeProbe::new(t)),
            Box::new(ProcessorProbe::new(t)),
            Box::new(VirtualMachineProbe::new(s)),
            Box::new(DebuggerProbe),
            Box::new(SleepTimingProbe::new(t)),
            Box::new(ProcessProbe::new(s)),
            Box::new(MemoryProbe::new(t)),
            Box::new(DiskProbe::new(t)),
        ];

        Engine { registry }
    }

    pub fn registry(&self) -> &[Box<dyn Probe>] {
        &self.registry
    }

    pub fn evaluate(&self, env: &dyn Environment) -> Report {
        evaluate(&self.registry, env)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new(Config::default())
    }
}
