//! Probes matching host strings against known virtualization and analysis
//! tooling.

use tracing::debug;

use super::{Observation, Probe, ProbeResult};
use crate::environment::Environment;
use crate::signature::{SignatureList, Signatures, BIOS_KEY, BIOS_VALUE};

/// Guest-tools registry keys and the BIOS descriptor.
pub struct VirtualMachineProbe {
    config_keys: SignatureList,
    bios_patterns: SignatureList,
}

impl VirtualMachineProbe {
    pub fn new(signatures: &Signatures) -> Self {
        VirtualMachineProbe {
            config_keys: signatures.config_keys.clone(),
            bios_patterns: signatures.bios_patterns.clone(),
        }
    }

    fn check_config_keys(&self, env: &dyn Environment, obs: &mut Observation) {
        for key in self.config_keys.iter() {
            match env.read_config_string(key, "") {
                Ok(Some(_)) => obs.warn(format!("Virtualization tools key present: {}", key)),
                Ok(None) => debug!(key, "config key absent"),
                Err(err) => obs.query_failed(&err),
            }
        }
    }

    fn check_bios(&self, env: &dyn Environment, obs: &mut Observation) {
        match env.read_config_string(BIOS_KEY, BIOS_VALUE) {
            Ok(Some(bios)) => {
                obs.fact(format!("BIOS version: {}", bios));
                if let Some(pattern) = self.bios_patterns.find_substring(&bios) {
                    obs.warn(format!("Virtual machine BIOS detected ({}, matched {})", bios, pattern));
                }
            }
            Ok(None) => debug!("no BIOS version string"),
            Err(err) => obs.query_failed(&err),
        }
    }
}

impl Probe for VirtualMachineProbe {
    fn name(&self) -> &'static str {
        "Virtual machine"
    }

    fn run(&self, env: &dyn Environment) -> ProbeResult {
        let mut obs = Observation::new(self.name());
        obs.fact(format!("Checked {} tools keys", self.config_keys.len()));
        self.check_config_keys(env, &mut obs);
        self.check_bios(env, &mut obs);

        obs.into()
    }
}

/// Running processes against a blacklist of executable names.
pub struct ProcessProbe {
    blacklist: SignatureList,
}

impl ProcessProbe {
    pub fn new(signatures: &Signatures) -> Self {
        ProcessProbe {
            blacklist: signatures.processes.clone(),
        }
    }
}

impl Probe for ProcessProbe {
    fn name(&self) -> &'static str {
        "Processes"
    }

    fn run(&self, env: &dyn Environment) -> ProbeResult {
        let mut obs = Observation::new(self.name());
        match env.list_running_process_names() {
            Ok(processes) => {
                obs.fact(format!("Scanned {} running processes", processes.len()));
                // keep going after a hit, every match is reported
                for name in &processes {
                    if self.blacklist.matches_exact_ignore_case(name).is_some() {
                        obs.warn(format!("Sandbox process detected ({})", name));
                    }
                }
            }
            Err(err) => obs.query_failed(&err),
        }

        obs.into()
    }
}
