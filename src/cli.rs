use crate::config::{PingOptions, MIN_INTERVAL};
use crate::opts::{self, ArgMode, OptError, OptionSpec, ParserState};
use log::LevelFilter;
use std::time::Duration;
use thiserror::Error;

pub const OPTIONS: &[OptionSpec] = &[
    OptionSpec {
        long: Some("count"),
        key: 'c',
        arg: ArgMode::Required,
        value_name: "COUNT",
        help: "Stop after sending COUNT packets",
        group: 0,
    },
    OptionSpec {
        long: Some("interval"),
        key: 'i',
        arg: ArgMode::Required,
        value_name: "SECONDS",
        help: "Wait SECONDS between sending each packet (default 1)",
        group: 0,
    },
    OptionSpec {
        long: Some("interface"),
        key: 'I',
        arg: ArgMode::Required,
        value_name: "IFACE",
        help: "Send packets through interface IFACE",
        group: 0,
    },
    OptionSpec {
        long: Some("ttl"),
        key: 't',
        arg: ArgMode::Required,
        value_name: "TTL",
        help: "Set IP TTL (default 64)",
        group: 0,
    },
    OptionSpec {
        long: Some("timeout"),
        key: 'W',
        arg: ArgMode::Required,
        value_name: "SECONDS",
        help: "Wait SECONDS for each reply (default 1)",
        group: 0,
    },
    OptionSpec {
        long: Some("verbose"),
        key: 'v',
        arg: ArgMode::Optional,
        value_name: "LEVEL",
        help: "Log diagnostics to stderr (LEVEL defaults to debug)",
        group: 1,
    },
    OptionSpec {
        long: Some("help"),
        key: '?',
        arg: ArgMode::None,
        value_name: "",
        help: "Display this help and exit",
        group: 1,
    },
];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CliError {
    /// Not a failure: the caller prints usage and exits successfully.
    #[error("help requested")]
    HelpRequested,
    #[error("missing host operand")]
    MissingDestination,
    #[error("extra operand '{0}'")]
    ExtraOperand(String),
    #[error("invalid ttl: {0}")]
    InvalidTtl(String),
    #[error("invalid count: {0}")]
    InvalidCount(String),
    #[error("invalid interval: {0}")]
    InvalidInterval(String),
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),
    #[error("option '-{0}' requires a value")]
    MissingValue(char),
    #[error("unrecognized option '{0}'")]
    UnknownOption(String),
    #[error("option '{0}' requires an argument")]
    MissingArgument(String),
    #[error("option '{0}' doesn't allow an argument")]
    UnexpectedArgument(String),
}

impl From<OptError<CliError>> for CliError {
    fn from(err: OptError<CliError>) -> Self {
        match err {
            OptError::UnknownOption(opt) => CliError::UnknownOption(opt),
            OptError::MissingArgument(opt) => CliError::MissingArgument(opt),
            OptError::UnexpectedArgument(opt) => CliError::UnexpectedArgument(opt),
            OptError::Callback(err) => err,
        }
    }
}

impl CliError {
    /// Errors caused by how the program was invoked, as opposed to bad values.
    pub fn wants_usage(&self) -> bool {
        matches!(
            self,
            CliError::MissingDestination | CliError::ExtraOperand(_)
        )
    }
}

/// Parses the full argument vector (program name first) into run options.
pub fn parse_args(argv: &[String]) -> Result<PingOptions, CliError> {
    let mut options = PingOptions::default();
    let first = opts::parse(OPTIONS, argv, &mut options, handle_option)?;

    let mut operands = argv[first.min(argv.len())..].iter();
    options.target = operands
        .next()
        .ok_or(CliError::MissingDestination)?
        .clone();
    if let Some(extra) = operands.next() {
        return Err(CliError::ExtraOperand(extra.clone()));
    }

    Ok(options)
}

fn handle_option(
    key: char,
    value: Option<&str>,
    state: &mut ParserState<'_, PingOptions>,
) -> Result<(), CliError> {
    let options = &mut *state.input;
    match key {
        '?' => return Err(CliError::HelpRequested),
        'v' => {
            options.log_level = Some(match value {
                Some(level) => level
                    .parse::<LevelFilter>()
                    .map_err(|_| CliError::InvalidLogLevel(level.to_string()))?,
                None => LevelFilter::Debug,
            })
        }
        _ => {
            let value = value.ok_or(CliError::MissingValue(key))?;
            match key {
                't' => options.ttl = parse_ttl(value)?,
                'c' => options.count = Some(parse_count(value)?),
                'i' => {
                    options.interval = parse_seconds(value)
                        .filter(|interval| *interval >= MIN_INTERVAL)
                        .ok_or_else(|| CliError::InvalidInterval(value.to_string()))?
                }
                'W' => {
                    options.timeout = parse_seconds(value)
                        .filter(|timeout| !timeout.is_zero())
                        .ok_or_else(|| CliError::InvalidTimeout(value.to_string()))?
                }
                'I' => options.interface = Some(value.to_string()),
                _ => {}
            }
        }
    }
    Ok(())
}

/// Accepts 1..=255.
pub fn parse_ttl(value: &str) -> Result<u8, CliError> {
    value
        .parse::<u8>()
        .ok()
        .filter(|ttl| *ttl > 0)
        .ok_or_else(|| CliError::InvalidTtl(value.to_string()))
}

fn parse_count(value: &str) -> Result<u64, CliError> {
    value
        .parse::<u64>()
        .ok()
        .filter(|count| *count > 0)
        .ok_or_else(|| CliError::InvalidCount(value.to_string()))
}

/// Fractional seconds such as `0.5`.
fn parse_seconds(value: &str) -> Option<Duration> {
    let seconds = value.parse::<f64>().ok()?;
    Duration::try_from_secs_f64(seconds).ok()
}

pub fn usage(progname: &str) -> String {
    format!(
        "Usage: {progname} [OPTIONS] DESTINATION\n\
         Send ICMP ECHO_REQUEST to network hosts.\n\
         \n\
         Options:\n\
         {}",
        opts::render_help(OPTIONS)
    )
}
