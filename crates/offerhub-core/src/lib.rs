pub mod app_config;
pub mod config;
pub mod roster;
pub mod types;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use roster::{load_roster, RosterFile, VendorConfig, VendorFormat};
pub use types::{
    AvailabilityStatus, CircuitPhase, CircuitState, NormalizedOffer, SelectionResult,
    VendorPerformanceStats,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for env var {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read vendor roster at {path}")]
    RosterFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse vendor roster YAML")]
    RosterFileParse(#[source] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),
}
