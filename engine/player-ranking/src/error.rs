//! Error types for the ranking engine

use thiserror::Error;

/// Result type for ranking engine operations
pub type Result<T> = std::result::Result<T, RankingError>;

/// Structural failures that stop a ranking run.
///
/// Bad individual data points never surface here; they degrade to a default
/// and are logged instead.
#[derive(Error, Debug)]
pub enum RankingError {
    #[error("Roster is empty or missing")]
    EmptyRoster,

    #[error("Configuration missing: {0}")]
    MissingConfiguration(String),

    #[error("No metric groups configured")]
    EmptyMetricGroups,

    #[error("Metric group '{0}' has no metrics")]
    EmptyGroup(String),

    #[error("Unknown metric '{0}'")]
    UnknownMetric(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}
