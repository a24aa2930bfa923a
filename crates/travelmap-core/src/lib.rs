pub mod app_config;
pub mod channels;
pub mod config;
pub mod country;

pub use app_config::{AppConfig, Environment, ScheduleConfig};
pub use channels::{load_channels, parse_channels, ChannelSeed, ChannelsFile, Gender};
pub use config::{load_app_config, load_app_config_from_env};
pub use country::{
    flag_emoji, Continent, CountryDescriptor, DetectionMethod, ParseContinentError,
    ParseDetectionMethodError,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read channels file {path}: {source}")]
    ChannelsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse channels file: {0}")]
    ChannelsFileParse(#[from] serde_yaml::Error),

    #[error("channels validation failed: {0}")]
    Validation(String),
}
