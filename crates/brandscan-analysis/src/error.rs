use thiserror::Error;

/// Errors returned by the analysis service client.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("analysis API returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// No API key is configured, so nothing can be submitted.
    #[error("analysis API key is not configured")]
    MissingApiKey,

    #[error("invalid analysis base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// The run completed but the thread holds no assistant text.
    #[error("analysis run produced no assistant message")]
    EmptyOutput,

    /// The assistant text is not a JSON object.
    #[error("analysis output is not valid JSON: {0}")]
    UnparseableOutput(String),
}
