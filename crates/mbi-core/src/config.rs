use std::path::PathBuf;

use rust_decimal::Decimal;

use crate::app_config::{AiSettings, AppConfig, DatabaseConfig, KpiTargets};
use crate::prompt::PromptTemplate;
use crate::settings::{load_settings, SettingsFile};
use crate::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "./config/mbi.yaml";
pub const DEFAULT_GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Load application configuration from `.env`, the process environment and
/// the YAML settings file.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing, the settings file
/// is unreadable, or any value fails validation.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the
/// process plus the settings file named by `MBI_CONFIG_PATH`.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing, the settings file
/// is unreadable, or any value fails validation.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    let lookup = |key: &str| std::env::var(key);
    let config_path = PathBuf::from(
        lookup("MBI_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string()),
    );
    let settings = load_settings(&config_path)?;
    build_app_config(lookup, &settings, config_path)
}

/// Merge env vars over the settings file and validate the result.
///
/// Env-var access goes through `lookup` so the merge can be tested with a
/// plain `HashMap` instead of mutating the process environment.
fn build_app_config<F>(
    lookup: F,
    settings: &SettingsFile,
    config_path: PathBuf,
) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let optional =
        |var: &str| -> Option<String> { lookup(var).ok().filter(|v| !v.trim().is_empty()) };

    let parse_u64 = |var: &str, default: u64| -> Result<u64, ConfigError> {
        match optional(var) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            }),
            None => Ok(default),
        }
    };

    let name = require("DB_NAME")?;
    let user = require("DB_USER")?;
    let password = require("DB_PASSWORD")?;

    let host = optional("DB_HOST")
        .or_else(|| settings.database.host.clone())
        .unwrap_or_else(|| "localhost".to_string());
    let port = match optional("DB_PORT") {
        Some(raw) => raw
            .trim()
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: "DB_PORT".to_string(),
                reason: e.to_string(),
            })?,
        None => settings.database.port.unwrap_or(5432),
    };
    let acquire_timeout_secs = parse_u64("MBI_DB_ACQUIRE_TIMEOUT_SECS", 10)?;

    let kpi_targets = build_kpi_targets(settings)?;
    let ai = AiSettings {
        model: settings
            .ai_settings
            .model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        temperature: settings.ai_settings.temperature.unwrap_or(0.3),
        max_output_tokens: settings.ai_settings.max_tokens.unwrap_or(4000),
        max_retries: settings.ai_settings.max_retries.unwrap_or(1),
        fail_fast: settings.ai_settings.fail_fast.unwrap_or(false),
        api_base_url: optional("GEMINI_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE_URL.to_string()),
        request_timeout_secs: parse_u64("MBI_AI_TIMEOUT_SECS", 60)?,
    };
    validate_ai_settings(&ai)?;

    let prompt_template = match settings.prompt.template.as_deref() {
        Some(text) => PromptTemplate::parse(text)?,
        None => PromptTemplate::default(),
    };

    Ok(AppConfig {
        database: DatabaseConfig {
            host,
            port,
            name,
            user,
            password,
            acquire_timeout_secs,
        },
        kpi_targets,
        ai,
        prompt_template,
        gemini_api_key: optional("GEMINI_API_KEY"),
        output_dir: PathBuf::from(
            optional("MBI_OUTPUT_DIR").unwrap_or_else(|| "output/reports".to_string()),
        ),
        log_level: optional("MBI_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        config_path,
    })
}

fn build_kpi_targets(settings: &SettingsFile) -> Result<KpiTargets, ConfigError> {
    let defaults = KpiTargets::default();
    let section = &settings.kpi_targets;
    let targets = KpiTargets {
        roas_target: section.roas_target.unwrap_or(defaults.roas_target),
        cpo_target: section.cpo_target.unwrap_or(defaults.cpo_target),
        cpm_benchmark: section.cpm_benchmark.unwrap_or(defaults.cpm_benchmark),
    };

    for (name, value) in [
        ("roas_target", targets.roas_target),
        ("cpo_target", targets.cpo_target),
        ("cpm_benchmark", targets.cpm_benchmark),
    ] {
        if value <= Decimal::ZERO {
            return Err(ConfigError::Validation(format!(
                "kpi_targets.{name} must be positive, got {value}"
            )));
        }
    }

    Ok(targets)
}

fn validate_ai_settings(ai: &AiSettings) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&ai.temperature) {
        return Err(ConfigError::Validation(format!(
            "ai_settings.temperature must be within [0, 1], got {}",
            ai.temperature
        )));
    }
    if ai.max_output_tokens == 0 {
        return Err(ConfigError::Validation(
            "ai_settings.max_tokens must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
