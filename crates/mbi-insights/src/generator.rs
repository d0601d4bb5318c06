//! One prompt, one (retried) Gemini call, one parsed [`InsightReport`].

use mbi_core::{AiSettings, PromptTemplate};
use mbi_kpi::KpiSet;

use crate::client::GeminiClient;
use crate::error::InsightError;
use crate::parse::parse_response;
use crate::prompt::build_prompt;
use crate::retry::retry_with_backoff;
use crate::types::InsightReport;

const DEFAULT_BACKOFF_BASE_MS: u64 = 1_000;

#[derive(Debug)]
pub struct InsightGenerator {
    client: GeminiClient,
    template: PromptTemplate,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl InsightGenerator {
    /// Build a generator against the configured Gemini endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`InsightError`] if the HTTP client cannot be constructed.
    pub fn new(
        api_key: &str,
        settings: &AiSettings,
        template: PromptTemplate,
    ) -> Result<Self, InsightError> {
        let client = GeminiClient::new(api_key, settings)?;
        Ok(Self::from_client(client, template, settings.max_retries))
    }

    #[must_use]
    pub fn from_client(client: GeminiClient, template: PromptTemplate, max_retries: u32) -> Self {
        Self {
            client,
            template,
            max_retries,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
        }
    }

    #[must_use]
    pub fn with_backoff_base_ms(mut self, backoff_base_ms: u64) -> Self {
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Render the prompt for `kpis`, call Gemini and parse the answer.
    ///
    /// # Errors
    ///
    /// Returns the last [`InsightError`] once retries are exhausted, or the
    /// first non-transient one.
    pub async fn generate(
        &self,
        kpis: &KpiSet,
        client_label: &str,
    ) -> Result<InsightReport, InsightError> {
        let prompt = build_prompt(&self.template, kpis, client_label);
        tracing::info!(
            model = self.client.model(),
            client = client_label,
            prompt_chars = prompt.len(),
            "requesting AI insights"
        );

        let text = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.client.generate_content(&prompt)
        })
        .await?;

        let (parsed, strategy) = parse_response(&text);
        tracing::info!(
            ?strategy,
            findings = parsed.key_findings.len(),
            recommendations = parsed.recommendations.len(),
            "parsed AI insights"
        );
        Ok(InsightReport::generated(self.client.model(), parsed, text))
    }
}
