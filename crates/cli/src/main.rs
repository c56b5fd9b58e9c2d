mod cli;
mod commands;
mod error;

use sqlmigrate_core::{init_logging, LoggingConfig};
use std::process::ExitCode;

use crate::error::UsageError;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let invocation = match cli::parse(std::env::args_os()) {
        Ok(invocation) => invocation,
        Err(err) => return usage_failure(err),
    };

    if let Err(e) = init_logging(LoggingConfig::from_verbosity(invocation.verbosity)) {
        eprintln!("logging init error: {}", e);
    }
    tracing::debug!(
        ?invocation,
        needs_database = invocation.request.needs_database(),
        "starting"
    );

    match commands::migrate::run(&invocation).await {
        Ok(report) => {
            println!("{}", report);
            ExitCode::SUCCESS
        }
        Err(err) => {
            println!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn usage_failure(err: UsageError) -> ExitCode {
    if let UsageError::Display(help) = &err {
        let _ = help.print();
        return ExitCode::from(err.exit_code());
    }

    println!("{}", err);
    if let UsageError::InvalidParameters { reason, .. } = &err {
        println!("{}", reason.trim_end());
    }
    if err.shows_usage() {
        println!();
        println!("{}", cli::usage());
    }

    ExitCode::from(err.exit_code())
}
