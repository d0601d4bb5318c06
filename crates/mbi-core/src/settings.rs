//! YAML settings file: database location, KPI targets, AI parameters and the
//! prompt template. Every section and every key is optional.

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::ConfigError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SettingsFile {
    pub database: DatabaseSection,
    pub kpi_targets: KpiTargetsSection,
    pub ai_settings: AiSection,
    pub prompt: PromptSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KpiTargetsSection {
    pub roas_target: Option<Decimal>,
    pub cpo_target: Option<Decimal>,
    pub cpm_benchmark: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AiSection {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub max_retries: Option<u32>,
    pub fail_fast: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PromptSection {
    pub template: Option<String>,
}

/// Load the settings file at `path`.
///
/// A missing file is not an error: a warning is logged and an empty
/// [`SettingsFile`] is returned so that defaults apply.
///
/// # Errors
///
/// Returns [`ConfigError::ConfigFileIo`] if the file exists but cannot be
/// read, or [`ConfigError::ConfigFileParse`] if it is not valid YAML.
pub fn load_settings(path: &Path) -> Result<SettingsFile, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(SettingsFile::default());
        }
        Err(e) => {
            return Err(ConfigError::ConfigFileIo {
                path: path.display().to_string(),
                source: e,
            })
        }
    };

    parse_settings(&content)
}

/// Parse settings from YAML text. An empty document yields defaults.
///
/// # Errors
///
/// Returns [`ConfigError::ConfigFileParse`] if the YAML is malformed or a
/// value has the wrong type.
pub fn parse_settings(content: &str) -> Result<SettingsFile, ConfigError> {
    if content.trim().is_empty() {
        return Ok(SettingsFile::default());
    }
    let settings: SettingsFile = serde_yaml::from_str(content)?;
    Ok(settings)
}
