//! Command line parsing and validation
//!
//! `parse` turns an argument list into an immutable [`Invocation`]; the
//! binary only maps its result to output and an exit code.

use clap::{ArgAction, CommandFactory, Parser};
use sqlmigrate_core::DEFAULT_CONFIG_PATH;
use std::ffi::OsString;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use crate::error::UsageError;

const ACTIONS: [&str; 3] = ["up", "down", "create"];

#[derive(Parser, Debug)]
#[command(name = "migrate")]
#[command(version)]
#[command(about = "Apply, roll back and create SQL migrations for PostgreSQL")]
#[command(override_usage = "migrate [OPTION]... DIRECTORY\n       migrate -a create [OPTION]... DIRECTORY NEWNAME")]
pub struct Cli {
    /// Set config file
    #[arg(short = 'c', long = "config", default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Migrate command, one of: up, down, create
    #[arg(short = 'a', long = "action", default_value = "up")]
    pub action: String,

    /// Number of migrations. 0 for up means "apply all", required for down
    #[arg(short = 'n', long = "number", default_value_t = 0, allow_negative_numbers = true)]
    pub number: i64,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Path to SQL migrations folder
    #[arg(value_name = "DIRECTORY")]
    pub directory: Option<PathBuf>,

    /// Name of new migration with create action
    #[arg(value_name = "NEWNAME")]
    pub name: Option<String>,
}

/// What one run of the tool should do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandRequest {
    /// Apply pending migrations; `limit == 0` applies all of them
    Apply { directory: PathBuf, limit: usize },
    /// Revert exactly `limit` migrations, newest first
    Rollback { directory: PathBuf, limit: NonZeroUsize },
    /// Write an empty migration file
    Create { directory: PathBuf, name: String },
}

impl CommandRequest {
    /// Whether the request needs a database connection
    pub fn needs_database(&self) -> bool {
        !matches!(self, CommandRequest::Create { .. })
    }
}

/// A validated command request plus the settings needed to carry it out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub config: PathBuf,
    pub verbosity: u8,
    pub request: CommandRequest,
}

/// Parse and validate an argument list (program name first)
pub fn parse<I, T>(args: I) -> Result<Invocation, UsageError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();

    let cli = Cli::try_parse_from(&args).map_err(|e| match e.kind() {
        clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
            UsageError::Display(e)
        }
        _ => {
            let rendered = e.to_string();
            let first_line = rendered.lines().next().unwrap_or_default();
            invalid_parameters(&args, first_line.trim_start_matches("error: "))
        }
    })?;

    cli.validate(&args)
}

/// Full help text, printed after parameter errors
pub fn usage() -> String {
    Cli::command().render_help().to_string()
}

fn invalid_parameters(args: &[OsString], reason: impl Into<String>) -> UsageError {
    let args = args
        .iter()
        .skip(1)
        .map(|arg| arg.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ");

    UsageError::InvalidParameters {
        args,
        reason: reason.into(),
    }
}

impl Cli {
    fn validate(self, args: &[OsString]) -> Result<Invocation, UsageError> {
        if self.config.is_empty() {
            return Err(invalid_parameters(args, "config path is empty"));
        }
        if !ACTIONS.contains(&self.action.as_str()) {
            return Err(invalid_parameters(
                args,
                format!("unknown action '{}'", self.action),
            ));
        }
        let limit = usize::try_from(self.number)
            .map_err(|_| invalid_parameters(args, format!("negative number {}", self.number)))?;

        let directory = self.directory.ok_or(UsageError::MissingDirectory)?;

        let request = match self.action.as_str() {
            "down" => CommandRequest::Rollback {
                directory,
                limit: NonZeroUsize::new(limit).ok_or(UsageError::MissingRollbackCount)?,
            },
            "create" => {
                let name = self
                    .name
                    .filter(|name| !name.is_empty())
                    .ok_or(UsageError::MissingName)?;
                if !is_plain_file_name(&name) {
                    return Err(UsageError::InvalidName(name));
                }
                CommandRequest::Create { directory, name }
            }
            _ => CommandRequest::Apply { directory, limit },
        };

        Ok(Invocation {
            config: PathBuf::from(self.config),
            verbosity: self.verbose,
            request,
        })
    }
}

fn is_plain_file_name(name: &str) -> bool {
    name != "." && name != ".." && !name.contains(['/', '\\'])
}
