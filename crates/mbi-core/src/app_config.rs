use std::path::PathBuf;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::prompt::PromptTemplate;

/// Connection settings for the campaign-attribution store.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
    pub acquire_timeout_secs: u64,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"[redacted]")
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .finish()
    }
}

/// Targets and benchmarks the computed KPIs are graded against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiTargets {
    pub roas_target: Decimal,
    pub cpo_target: Decimal,
    pub cpm_benchmark: Decimal,
}

impl Default for KpiTargets {
    fn default() -> Self {
        Self {
            roas_target: Decimal::new(35, 1),
            cpo_target: Decimal::new(25, 0),
            cpm_benchmark: Decimal::new(15, 0),
        }
    }
}

/// Parameters for the generative text service.
#[derive(Debug, Clone, PartialEq)]
pub struct AiSettings {
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub max_retries: u32,
    pub fail_fast: bool,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub kpi_targets: KpiTargets,
    pub ai: AiSettings,
    pub prompt_template: PromptTemplate,
    pub gemini_api_key: Option<String>,
    pub output_dir: PathBuf,
    pub log_level: String,
    pub config_path: PathBuf,
}

impl AppConfig {
    /// Return the Gemini API key, failing when it was not supplied.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::MissingEnvVar`] naming `GEMINI_API_KEY`.
    pub fn require_gemini_api_key(&self) -> Result<&str, crate::ConfigError> {
        self.gemini_api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| crate::ConfigError::MissingEnvVar("GEMINI_API_KEY".to_string()))
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database", &self.database)
            .field("kpi_targets", &self.kpi_targets)
            .field("ai", &self.ai)
            .field("prompt_template", &self.prompt_template)
            .field(
                "gemini_api_key",
                &self.gemini_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("output_dir", &self.output_dir)
            .field("log_level", &self.log_level)
            .field("config_path", &self.config_path)
            .finish()
    }
}
