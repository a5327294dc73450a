use std::ffi::{OsStr, OsString};
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, anyhow};
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use crate::config::{Config, split_assignment};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tick",
    version,
    about = "Ticklist: a small persistent todo list",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    /// Setting override, `KEY=VALUE`. Repeatable.
    #[arg(long = "rc", value_name = "KEY=VALUE", value_parser = parse_rc_flag)]
    pub rc_overrides: Vec<(String, String)>,

    #[arg(long = "ticklistrc", value_name = "FILE")]
    pub ticklistrc: Option<PathBuf>,

    #[arg(long = "data", value_name = "DIR")]
    pub data: Option<PathBuf>,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<OsString>,
}

fn parse_rc_flag(raw: &str) -> Result<(String, String), String> {
    split_assignment(raw)
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got: {raw}"))
}

/// `-q` wins over `-v`; `RUST_LOG` wins over both.
fn level_for(verbose: u8, quiet: u8) -> LevelFilter {
    match (quiet, verbose) {
        (2.., _) => LevelFilter::ERROR,
        (1, _) | (0, 0) => LevelFilter::WARN,
        (0, 1) => LevelFilter::INFO,
        (0, 2) => LevelFilter::DEBUG,
        (0, _) => LevelFilter::TRACE,
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(level_for(verbose, quiet).into())
        .from_env()
        .context("invalid RUST_LOG filter")?;

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_thread_names(true)
        .try_init();
    if installed.is_err() {
        debug!("tracing subscriber already installed");
    }
    Ok(())
}

/// Arguments with positional `rc.KEY=VALUE` (or `rc.KEY:VALUE`) settings
/// taken out.
#[derive(Debug, Clone, Default)]
pub struct SplitArgs {
    pub args: Vec<OsString>,
    pub overrides: Vec<(String, String)>,
}

#[tracing::instrument(skip_all)]
pub fn split_rc_args(raw: Vec<OsString>) -> SplitArgs {
    let mut split = SplitArgs::default();
    for (pos, arg) in raw.into_iter().enumerate() {
        match positional_override(&arg).filter(|_| pos > 0) {
            Some((key, value)) => {
                debug!(key = %key, value = %value, "positional setting");
                split.overrides.push((key, value));
            }
            None => split.args.push(arg),
        }
    }
    split
}

fn positional_override(arg: &OsStr) -> Option<(String, String)> {
    let body = arg.to_str()?.strip_prefix("rc.")?;
    let at = body.find(['=', ':'])?;
    let key = &body[..at];
    (!key.is_empty()).then(|| (key.to_string(), body[at + 1..].to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub command_args: Vec<String>,
}

impl Invocation {
    #[tracing::instrument(skip(cfg, rest))]
    pub fn parse(cfg: &Config, rest: Vec<OsString>) -> anyhow::Result<Self> {
        let tokens: Vec<String> = rest
            .into_iter()
            .map(|arg| arg.to_string_lossy().to_string())
            .collect();

        let Some(first) = tokens.first() else {
            let cmd = cfg.default_command.clone();
            debug!(command = %cmd, "no explicit command, using default");
            return Ok(Self {
                command: cmd,
                command_args: vec![],
            });
        };

        if tokens.len() == 1 && first.parse::<u64>().is_ok() {
            debug!(token = %first, "single numeric token interpreted as info query");
            return Ok(Self {
                command: "info".to_string(),
                command_args: tokens,
            });
        }

        let known = crate::commands::known_command_names();
        let command = crate::commands::expand_command_abbrev(first, &known)
            .ok_or_else(|| anyhow!("unknown or ambiguous command: {first}"))?;
        debug!(token = %first, expanded = %command, "resolved command token");

        Ok(Self {
            command: command.to_string(),
            command_args: tokens[1..].to_vec(),
        })
    }
}
