//! Diagnostic logging setup
//!
//! Results meant for the user are printed on stdout by the CLI; everything
//! emitted through `tracing` goes to stderr so the two never interleave in
//! scripted use.

use std::io::{self, IsTerminal};
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration for the migration tool
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "warn", "info", "debug")
    pub level: String,
    /// Include the event target in each line
    pub include_target: bool,
    /// Colour the output
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            include_target: false,
            ansi: false,
        }
    }
}

impl LoggingConfig {
    /// Map the number of `-v` flags to a level; colours only on a terminal
    pub fn from_verbosity(verbosity: u8) -> Self {
        let level = match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        Self {
            level: level.to_string(),
            include_target: verbosity >= 2,
            ansi: io::stderr().is_terminal(),
        }
    }
}

/// Install the global subscriber; `RUST_LOG` wins over the configured level
pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            Layer::new()
                .with_writer(io::stderr)
                .with_ansi(config.ansi)
                .with_target(config.include_target),
        )
        .try_init()?;

    tracing::debug!(
        target: "sqlmigrate::logging",
        "logging initialized (level: {})",
        config.level
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(LoggingConfig::from_verbosity(0).level, "warn");
        assert_eq!(LoggingConfig::from_verbosity(1).level, "info");
        assert_eq!(LoggingConfig::from_verbosity(2).level, "debug");
        assert_eq!(LoggingConfig::from_verbosity(9).level, "trace");
        assert!(!LoggingConfig::from_verbosity(1).include_target);
        assert!(LoggingConfig::from_verbosity(2).include_target);
    }

    #[test]
    fn test_colour_follows_stderr_terminal() {
        assert_eq!(LoggingConfig::from_verbosity(0).ansi, io::stderr().is_terminal());
        assert!(!LoggingConfig::default().ansi);
    }
}
