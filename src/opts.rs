//! A small getopt-style scanner.
//!
//! Options are described by a table of [`OptionSpec`]s. [`parse`] walks the
//! argument vector left to right and hands every option occurrence to a
//! callback, which fills in the caller's configuration. Scanning stops at the
//! first positional argument, at a lone `-`, or after `--`.
//!
//! Supported forms:
//!
//! * `--name`, `--name=value`, `--name value` (the last only for
//!   [`ArgMode::Required`])
//! * `-abc` clusters of flags, `-tVALUE` and `-t VALUE`
use std::fmt::Write as _;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgMode {
    /// The option never takes a value.
    None,
    /// A value must follow, inline or as the next argument.
    Required,
    /// A value may follow inline (`-vVALUE`, `--name=VALUE`), never as the
    /// next argument.
    Optional,
}

#[derive(Debug, Clone, Copy)]
pub struct OptionSpec {
    pub long: Option<&'static str>,
    pub key: char,
    pub arg: ArgMode,
    /// Placeholder shown in help output, e.g. `TTL`.
    pub value_name: &'static str,
    pub help: &'static str,
    /// Options are grouped in help output; groups are separated by a blank line.
    pub group: u8,
}

impl OptionSpec {
    fn signature(&self) -> String {
        let value = match (self.arg, self.long.is_some()) {
            (ArgMode::None, _) => String::new(),
            (ArgMode::Required, true) => format!("={}", self.value_name),
            (ArgMode::Required, false) => format!(" {}", self.value_name),
            (ArgMode::Optional, true) => format!("[={}]", self.value_name),
            (ArgMode::Optional, false) => format!("[{}]", self.value_name),
        };
        match self.long {
            Some(long) => format!("-{}, --{long}{value}", self.key),
            None => format!("-{}{value}", self.key),
        }
    }
}

/// Passed to the callback on every option occurrence.
pub struct ParserState<'a, C> {
    pub argv: &'a [String],
    /// Index of the argument the current option (or its value) was read from.
    pub index: usize,
    pub input: &'a mut C,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum OptError<E> {
    #[error("unrecognized option '{0}'")]
    UnknownOption(String),
    #[error("option '{0}' requires an argument")]
    MissingArgument(String),
    #[error("option '{0}' doesn't allow an argument")]
    UnexpectedArgument(String),
    /// The callback rejected an option; scanning stopped there.
    #[error("{0}")]
    Callback(E),
}

fn find_long<'s>(specs: &'s [OptionSpec], name: &str) -> Option<&'s OptionSpec> {
    specs.iter().find(|spec| spec.long == Some(name))
}

fn find_short(specs: &[OptionSpec], key: char) -> Option<&OptionSpec> {
    specs.iter().find(|spec| spec.key == key)
}

/// Scans `argv` (program name at index 0) and calls `callback` once per
/// option. Returns the index of the first positional argument, which is
/// `argv.len()` when there are none. `argv` is never modified.
pub fn parse<C, E, F>(
    specs: &[OptionSpec],
    argv: &[String],
    input: &mut C,
    mut callback: F,
) -> Result<usize, OptError<E>>
where
    F: FnMut(char, Option<&str>, &mut ParserState<'_, C>) -> Result<(), E>,
{
    let mut state = ParserState {
        argv,
        index: 1,
        input,
    };

    let mut i = 1;
    while i < argv.len() {
        let token = argv[i].as_str();
        if token == "-" || !token.starts_with('-') {
            break;
        }
        if token == "--" {
            i += 1;
            break;
        }

        if let Some(body) = token.strip_prefix("--") {
            let (name, inline) = match body.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (body, None),
            };
            let spec = find_long(specs, name)
                .ok_or_else(|| OptError::UnknownOption(format!("--{name}")))?;

            let value = match spec.arg {
                ArgMode::Required => match inline {
                    Some(value) => Some(value),
                    None => {
                        i += 1;
                        let next = argv
                            .get(i)
                            .ok_or_else(|| OptError::MissingArgument(format!("--{name}")))?;
                        Some(next.as_str())
                    }
                },
                ArgMode::Optional => inline,
                ArgMode::None => {
                    if inline.is_some() {
                        return Err(OptError::UnexpectedArgument(format!("--{name}")));
                    }
                    None
                }
            };

            state.index = i;
            callback(spec.key, value, &mut state).map_err(OptError::Callback)?;
        } else {
            let cluster = &token[1..];
            for (offset, key) in cluster.char_indices() {
                let spec = find_short(specs, key)
                    .ok_or_else(|| OptError::UnknownOption(format!("-{key}")))?;
                let rest = &cluster[offset + key.len_utf8()..];

                let value = match spec.arg {
                    ArgMode::Required if !rest.is_empty() => Some(rest),
                    ArgMode::Required => {
                        i += 1;
                        let next = argv
                            .get(i)
                            .ok_or_else(|| OptError::MissingArgument(format!("-{key}")))?;
                        Some(next.as_str())
                    }
                    ArgMode::Optional => Some(rest).filter(|rest| !rest.is_empty()),
                    ArgMode::None => None,
                };

                state.index = i;
                callback(spec.key, value, &mut state).map_err(OptError::Callback)?;

                // The rest of the token (if any) was this option's value.
                if spec.arg != ArgMode::None {
                    break;
                }
            }
        }
        i += 1;
    }

    Ok(i)
}

/// Renders one line per option in table order, e.g.
/// `  -t, --ttl=TTL       Set IP TTL`.
pub fn render_help(specs: &[OptionSpec]) -> String {
    let signatures: Vec<String> = specs.iter().map(OptionSpec::signature).collect();
    let width = signatures.iter().map(String::len).max().unwrap_or(0) + 2;

    let mut help = String::new();
    let mut group = specs.first().map(|spec| spec.group);
    for (spec, signature) in specs.iter().zip(&signatures) {
        if group != Some(spec.group) {
            help.push('\n');
            group = Some(spec.group);
        }
        writeln!(help, "  {signature:<width$}{}", spec.help).ok();
    }
    help
}
