use thiserror::Error;

/// Errors returned while generating insights from the Gemini API.
#[derive(Debug, Error)]
pub enum InsightError {
    /// Network, TLS or timeout failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("Gemini API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The API answered successfully but produced no text.
    #[error("Gemini returned no text: {reason}")]
    EmptyResponse { reason: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The configured API base URL is not a valid URL.
    #[error("invalid Gemini base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
