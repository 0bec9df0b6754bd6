use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Arg, ArgAction, Command};
use tracing::error;
use tracing_subscriber::EnvFilter;

use sandcrab::report::{self, Format};
use sandcrab::{host_environment, Config, Engine, Verdict};

fn main() -> ExitCode {
    let matches = Command::new("sandcrab")
        .version("0.1")
        .author("0xcpu")
        .about("Checks whether this machine looks like a malware analysis sandbox")
        .arg(Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Override thresholds and signatures from a JSON file"))
        .arg(Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Print the report as JSON"))
        .arg(Arg::new("exit-code")
                .long("exit-code")
                .action(ArgAction::SetTrue)
                .help("Exit with status 1 when a sandbox is likely"))
        .arg(Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Log each probe to stderr"))
        .get_matches();

    let default_level = if matches.get_flag("verbose") { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(err) => {
                error!("{}", err);
                return ExitCode::from(2);
            }
        },
        None => Config::default(),
    };

    let format = if matches.get_flag("json") { Format::Json } else { Format::Text };
    if let Err(err) = report::write_banner(format, &mut io::stdout()) {
        error!("failed writing report: {}", err);
        return ExitCode::from(2);
    }

    let env = host_environment();
    let scan = Engine::new(config).evaluate(env.as_ref());

    if let Err(err) = report::write_report(&scan, format, &mut io::stdout().lock()) {
        error!("failed writing report: {}", err);
        return ExitCode::from(2);
    }

    if matches.get_flag("exit-code") && scan.verdict == Verdict::SandboxLikely {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
