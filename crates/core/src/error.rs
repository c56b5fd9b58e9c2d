use std::path::PathBuf;
use thiserror::Error;

/// Failures while loading the YAML configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not unmarshal config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
