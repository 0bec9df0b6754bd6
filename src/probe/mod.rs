//! Probes: independent heuristics that each look at one aspect of the host.

use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::environment::Environment;
use crate::error::QueryError;

pub mod signature;
pub mod threshold;
pub mod timing;

pub use signature::{ProcessProbe, VirtualMachineProbe};
pub use threshold::{DebuggerProbe, DiskProbe, MemoryProbe, ProcessorProbe, UptimeProbe};
pub use timing::SleepTimingProbe;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    Suspicious,
    Clean,
}

impl Indicator {
    pub fn is_suspicious(self) -> bool {
        self == Indicator::Suspicious
    }
}

/// What a probe saw. Only used for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Observation {
    pub probe: &'static str,
    pub facts: Vec<String>,
    pub warnings: Vec<String>,
    pub query_errors: Vec<String>,
}

impl Observation {
    pub fn new(probe: &'static str) -> Self {
        Observation {
            probe,
            facts: Vec::new(),
            warnings: Vec::new(),
            query_errors: Vec::new(),
        }
    }

    pub fn fact(&mut self, fact: impl Into<String>) {
        self.facts.push(fact.into());
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Record a query that could not be answered. It does not count as a warning.
    ///
    /// A facility the platform does not have at all is not a failure and is
    /// only logged at debug level.
    pub fn query_failed(&mut self, err: &QueryError) {
        if let QueryError::Unsupported(facility) = err {
            debug!(probe = self.probe, facility = *facility, "facility not available here");
            return;
        }

        warn!(probe = self.probe, error = %err, "query failed, treating as clean");
        self.query_errors.push(err.to_string());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub indicator: Indicator,
    pub observation: Observation,
}

impl From<Observation> for ProbeResult {
    /// A probe is suspicious exactly when it raised at least one warning.
    fn from(observation: Observation) -> Self {
        let indicator = if observation.warnings.is_empty() {
            Indicator::Clean
        } else {
            Indicator::Suspicious
        };

        ProbeResult {
            indicator,
            observation,
        }
    }
}

pub trait Probe {
    fn name(&self) -> &'static str;

    fn run(&self, env: &dyn Environment) -> ProbeResult;
}

impl fmt::Debug for dyn Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Probe({})", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_makes_suspicious() {
        let mut obs = Observation::new("x");
        obs.fact("measured");
        assert_eq!(ProbeResult::from(obs.clone()).indicator, Indicator::Clean);

        obs.warn("bad");
        assert_eq!(ProbeResult::from(obs).indicator, Indicator::Suspicious);
    }

    #[test]
    fn test_query_failure_stays_clean() {
        let mut obs = Observation::new("x");
        obs.query_failed(&QueryError::Os {
            facility: "GetTickCount64",
            code: 5,
        });
        let result = ProbeResult::from(obs);
        assert_eq!(result.indicator, Indicator::Clean);
        assert_eq!(result.observation.query_errors.len(), 1);
    }

    #[test]
    fn test_missing_facility_is_not_a_failure() {
        let mut obs = Observation::new("x");
        obs.query_failed(&QueryError::Unsupported("registry"));
        let result = ProbeResult::from(obs);
        assert_eq!(result.indicator, Indicator::Clean);
        assert!(result.observation.query_errors.is_empty());
    }
}
