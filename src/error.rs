use thiserror::Error;

/// Failures of one translation-service call.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("translation API key is not set (expected in {env})")]
    MissingKey { env: String },
    #[error("translation API error ({status}): {body}")]
    Upstream { status: u16, body: String },
    #[error("translation request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to parse translation response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("translation response contained no text")]
    EmptyResponse,
}
