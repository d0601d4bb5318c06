//! AI-generated narrative insights for a computed [`mbi_kpi::KpiSet`].

pub mod client;
pub mod error;
pub mod generator;
pub mod parse;
pub mod prompt;
pub(crate) mod retry;
pub mod types;

pub use client::GeminiClient;
pub use error::InsightError;
pub use generator::InsightGenerator;
pub use parse::{parse_response, ParseStrategy, ParsedInsights};
pub use prompt::{build_prompt, data_summary, kpi_values};
pub use types::{InsightOrigin, InsightReport};
