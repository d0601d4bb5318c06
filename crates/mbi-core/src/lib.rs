//! Shared configuration and domain records for the media buy insights pipeline.

pub mod app_config;
pub mod config;
pub mod prompt;
pub mod records;
pub mod settings;

pub use app_config::{AiSettings, AppConfig, DatabaseConfig, KpiTargets};
pub use config::{load_app_config, load_app_config_from_env};
pub use prompt::{PromptSlot, PromptTemplate, PromptValues};
pub use records::{CampaignDataset, CampaignRecord, ClientScope};
pub use settings::{load_settings, SettingsFile};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read config file {path}: {source}")]
    ConfigFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    ConfigFileParse(#[from] serde_yaml::Error),

    #[error("config validation failed: {0}")]
    Validation(String),
}
