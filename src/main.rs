use anyhow::{Context, Result};
use log::LevelFilter;
use rping::cli::{self, CliError};
use rping::{signal, CancelToken, Engine, IcmpSocket, PingOptions, Target};
use std::env;
use std::io;
use std::process::ExitCode;

const USAGE_EXIT: u8 = 2;

fn main() -> ExitCode {
    let argv: Vec<String> = env::args().collect();
    let progname = argv.first().map(String::as_str).unwrap_or("rping");

    let options = match cli::parse_args(&argv) {
        Ok(options) => options,
        Err(CliError::HelpRequested) => {
            print!("{}", cli::usage(progname));
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            eprintln!("{progname}: {err}");
            if err.wants_usage() {
                eprint!("{}", cli::usage(progname));
            } else {
                eprintln!("Try '{progname} --help' for more information.");
            }
            return ExitCode::from(USAGE_EXIT);
        }
    };

    init_logging(options.log_level);

    match run(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{progname}: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: Option<LevelFilter>) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Warn).parse_default_env();
    // An explicit -v beats RUST_LOG.
    if let Some(level) = level {
        builder.filter_level(level);
    }
    builder.init();
}

fn run(options: &PingOptions) -> Result<()> {
    let target = Target::resolve(&options.target)
        .with_context(|| format!("Error resolving {}", options.target))?;

    let cancel = CancelToken::new();
    signal::cancel_on_interrupt(&cancel).context("Error setting up interrupt handling")?;

    let socket = IcmpSocket::open(target.addr, options).context("Error opening ICMP socket")?;
    let summary = Engine::new(socket, target, options, cancel, io::stdout())
        .run()
        .context("Error while pinging")?;
    log::debug!("finished: {:?}", summary);

    Ok(())
}
