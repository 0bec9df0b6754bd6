//! Sleep-acceleration detection.

use std::time::Duration;

use tracing::debug;

use super::{Observation, Probe, ProbeResult};
use crate::config::Thresholds;
use crate::environment::Environment;

/// Detects accelerated or skipped sleeps.
///
/// Blocks for the whole nominal delay. The provider measures on a monotonic
/// clock, not the tick counter the uptime probe reads, so tampering with one
/// source does not hide the other.
pub struct SleepTimingProbe {
    nominal: Duration,
    minimum: Duration,
}

impl SleepTimingProbe {
    /// Thresholds that overflow (only possible when built without
    /// [`Thresholds::validate`]) demand the full nominal delay.
    pub fn new(thresholds: &Thresholds) -> Self {
        let nominal = thresholds.sleep_nominal();
        SleepTimingProbe {
            nominal,
            minimum: thresholds.sleep_minimum().unwrap_or(nominal),
        }
    }
}

impl Probe for SleepTimingProbe {
    fn name(&self) -> &'static str {
        "Sleep timing"
    }

    fn run(&self, env: &dyn Environment) -> ProbeResult {
        let mut obs = Observation::new(self.name());
        debug!(nominal = ?self.nominal, "sleeping");
        match env.sleep_for(self.nominal) {
            Ok(elapsed) => {
                obs.fact(format!(
                    "Sleep timing test: expected ~{:.1}s, measured {:.2}s",
                    self.nominal.as_secs_f64(),
                    elapsed.as_secs_f64()
                ));
                if elapsed < self.minimum {
                    obs.warn("Sleep timing is being manipulated. Possible sandbox");
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

    fn run_with(measured: Duration) -> ProbeResult {
        let mut env = FakeEnvironment::normal();
        env.measured_sleep = Some(measured);
        SleepTimingProbe::new(&Thresholds::default()).run(&env)
    }

    #[test]
    fn test_short_sleep_is_suspicious() {
        assert_eq!(run_with(Duration::from_millis(4400)).indicator, Indicator::Suspicious);
        assert_eq!(run_with(Duration::from_millis(10)).indicator, Indicator::Suspicious);
    }

    #[test]
    fn test_real_sleep_is_clean() {
        assert_eq!(run_with(Duration::from_millis(4600)).indicator, Indicator::Clean);
        assert_eq!(run_with(Duration::from_millis(4500)).indicator, Indicator::Clean);
        assert_eq!(run_with(Duration::from_secs(7)).indicator, Indicator::Clean);
    }

    #[test]
    fn test_fact_reports_measurement() {
        let result = run_with(Duration::from_millis(4400));
        assert_eq!(
            result.observation.facts,
            vec!["Sleep timing test: expected ~5.0s, measured 4.40s".to_string()]
        );
    }

    #[test]
    fn test_unvalidated_overflow_does_not_panic() {
        let t = Thresholds {
            sleep_nominal_ms: u64::MAX,
            sleep_tolerance_percent: u32::MAX,
            ..Thresholds::default()
        };
        let mut env = FakeEnvironment::normal();
        env.measured_sleep = Some(Duration::from_secs(1));
        assert_eq!(SleepTimingProbe::new(&t).run(&env).indicator, Indicator::Suspicious);
    }

    #[test]
    fn test_failed_sleep_is_clean() {
        let mut env = FakeEnvironment::normal();
        env.measured_sleep = None;
        let result = SleepTimingProbe::new(&Thresholds::default()).run(&env);
        assert_eq!(result.indicator, Indicator::Clean);
        assert_eq!(result.observation.query_errors.len(), 1);
    }
}
