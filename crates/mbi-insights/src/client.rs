//! HTTP client for the Gemini `generateContent` endpoint.
//!
//! Wraps `reqwest` with Gemini-specific request shaping, API key handling and
//! response text extraction. Non-2xx statuses surface as
//! [`InsightError::Api`] carrying the status and the API's error message.

use std::time::Duration;

use mbi_core::AiSettings;
use reqwest::{Client, Url};
use serde_json::Value;

use crate::error::InsightError;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Client for one configured Gemini model.
///
/// Use [`GeminiClient::new`] with the loaded settings, or
/// [`GeminiClient::with_base_url`] to point at a mock server in tests.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    endpoint: Url,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_key", &"[redacted]")
            .field("endpoint", &self.endpoint.as_str())
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Creates a client for the model, endpoint and timeout in `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`InsightError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`InsightError::InvalidBaseUrl`] if the
    /// configured base URL does not parse.
    pub fn new(api_key: &str, settings: &AiSettings) -> Result<Self, InsightError> {
        Self::with_base_url(api_key, settings, &settings.api_base_url)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Same as [`GeminiClient::new`].
    pub fn with_base_url(
        api_key: &str,
        settings: &AiSettings,
        base_url: &str,
    ) -> Result<Self, InsightError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("mbi/0.1 (media-buy-insights)")
            .build()?;

        let raw = format!(
            "{}/{}:generateContent",
            base_url.trim_end_matches('/'),
            model_path(&settings.model)
        );
        let endpoint = Url::parse(&raw).map_err(|e| InsightError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            endpoint,
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_output_tokens: settings.max_output_tokens,
        })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Sends one `generateContent` request and returns the concatenated text
    /// of the first candidate.
    ///
    /// # Errors
    ///
    /// - [`InsightError::Http`] on network failure or timeout.
    /// - [`InsightError::Api`] on a non-2xx status.
    /// - [`InsightError::Deserialize`] if the body is not JSON.
    /// - [`InsightError::EmptyResponse`] if no text came back.
    pub async fn generate_content(&self, prompt: &str) -> Result<String, InsightError> {
        let payload = self.request_body(prompt);
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(InsightError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        let json: Value = serde_json::from_str(&body).map_err(|e| InsightError::Deserialize {
            context: format!("generateContent(model={})", self.model),
            source: e,
        })?;

        extract_text(&json)
    }

    fn request_body(&self, prompt: &str) -> Value {
        serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_output_tokens
            }
        })
    }
}

fn model_path(model: &str) -> String {
    let m = model.trim();
    if m.starts_with("models/") {
        m.to_string()
    } else {
        format!("models/{m}")
    }
}

/// Pull `error.message` out of a Gemini error body, falling back to the raw
/// body text.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().chars().take(500).collect())
}

fn extract_text(json: &Value) -> Result<String, InsightError> {
    let Some(candidate) = json
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
    else {
        let reason = json
            .get("promptFeedback")
            .and_then(|f| f.get("blockReason"))
            .and_then(Value::as_str)
            .map_or_else(
                || "no candidates".to_string(),
                |r| format!("prompt blocked: {r}"),
            );
        return Err(InsightError::EmptyResponse { reason });
    };

    let text: String = candidate
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();

    if text.trim().is_empty() {
        let reason = candidate
            .get("finishReason")
            .and_then(Value::as_str)
            .map_or_else(
                || "empty candidate".to_string(),
                |r| format!("finish reason {r}"),
            );
        return Err(InsightError::EmptyResponse { reason });
    }

    Ok(text)
}
