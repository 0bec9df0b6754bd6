//! # sandcrab
//!
//! `sandcrab` runs a set of heuristics against the host to decide whether it
//! looks like an automated analysis sandbox, the same way malware does before
//! deciding whether to behave.
//!
//! ```no_run
//! use sandcrab::{host_environment, Config, Engine, Verdict};
//!
//! let report = Engine::new(Config::default()).evaluate(host_environment().as_ref());
//! if report.verdict == Verdict::SandboxLikely {
//!     println!("being watched");
//! }
//! ```

pub mod config;
pub mod engine;
pub mod environment;
pub mod error;
pub mod probe;
pub mod report;
pub mod signature;

#[cfg(unix)]
pub mod unix;
#[cfg(windows)]
pub mod windows;

pub use config::{Config, Thresholds};
pub use engine::{evaluate, Engine, Report, Verdict};
pub use environment::{host_environment, Environment};
pub use error::{Error, QueryError};
pub use probe::{Indicator, Observation, Probe, ProbeResult};
