//! Text and JSON rendering of a [`Report`].

use std::io::{self, Write};

use crate::engine::{Report, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

/// Line printed before the scan starts. JSON output has none so stdout stays
/// one document.
pub fn write_banner<W: Write>(format: Format, out: &mut W) -> io::Result<()> {
    match format {
        Format::Text => writeln!(out, "[+] Running sandbox detector..."),
        Format::Json => Ok(()),
    }
}

pub fn write_report<W: Write>(report: &Report, format: Format, out: &mut W) -> io::Result<()> {
    match format {
        Format::Text => write_text(report, out),
        Format::Json => write_json(report, out),
    }
}

pub fn write_text<W: Write>(report: &Report, out: &mut W) -> io::Result<()> {
    for result in &report.results {
        let obs = &result.observation;
        for fact in &obs.facts {
            writeln!(out, "[*] {}", fact)?;
        }
        for err in &obs.query_errors {
            writeln!(out, "[?] {}: {}", obs.probe, err)?;
        }
        for warning in &obs.warnings {
            writeln!(out, "[!] Suspicious: {}!", warning)?;
        }
    }

    writeln!(out)?;
    match report.verdict {
        Verdict::SandboxLikely => writeln!(out, "[!] Warning: Possible sandbox environment detected!"),
        Verdict::Normal => writeln!(out, "[*] No sandbox indicators found. Running on a normal machine."),
    }
}

pub fn write_json<W: Write>(report: &Report, out: &mut W) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::evaluate;
    use crate::environment::fake::FakeEnvironment;
    use crate::probe::{DebuggerProbe, Probe, UptimeProbe};
    use crate::config::Thresholds;

    fn report(env: &FakeEnvironment) -> Report {
        let registry: Vec<Box<dyn Probe>> = vec![
            Box::new(UptimeProbe::new(&Thresholds::default())),
            Box::new(DebuggerProbe),
        ];
        evaluate(&registry, env)
    }

    fn text(report: &Report) -> String {
        let mut buf = Vec::new();
        write_text(report, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_text_normal() {
        let out = text(&report(&FakeEnvironment::normal()));
        assert_eq!(
            out,
            "[*] System uptime: 86400 seconds\n\
             [*] Debugger attached: no\n\
             \n\
             [*] No sandbox indicators found. Running on a normal machine.\n"
        );
    }

    #[test]
    fn test_text_warning_and_failure() {
        let mut env = FakeEnvironment::normal();
        env.debugger = Some(true);
        env.uptime = None;
        let out = text(&report(&env));
        assert!(out.contains("[?] System uptime: uptime failed with OS error 5\n"));
        assert!(out.contains("[!] Suspicious: Debugger detected. Possible sandbox!\n"));
        assert!(out.ends_with("[!] Warning: Possible sandbox environment detected!\n"));
    }

    #[test]
    fn test_json() {
        let mut buf = Vec::new();
        write_json(&report(&FakeEnvironment::normal()), &mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["verdict"], "normal");
        assert_eq!(value["results"][1]["indicator"], "clean");
        assert_eq!(value["results"][0]["observation"]["probe"], "System uptime");
    }

    #[test]
    fn test_json_stdout_is_one_document() {
        let mut buf = Vec::new();
        write_banner(Format::Json, &mut buf).unwrap();
        write_report(&report(&FakeEnvironment::normal()), Format::Json, &mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["suspicious_count"], 0);
    }

    #[test]
    fn test_text_starts_with_banner() {
        let mut buf = Vec::new();
        write_banner(Format::Text, &mut buf).unwrap();
        write_report(&report(&FakeEnvironment::normal()), Format::Text, &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert!(out.starts_with("[+] Running sandbox detector...\n[*] System uptime"));
    }
}
