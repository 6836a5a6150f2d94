//! Client error taxonomy and the API response envelope.

use serde::Deserialize;

/// JSON envelope returned by every platform endpoint.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

/// Client-observable error taxonomy for scan polling and API access.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Job id unknown or expired server-side. Terminal, non-retryable.
    #[error("Scan not found: {0}")]
    NotFound(String),

    /// Attempt budget exhausted while the job stayed non-terminal.
    #[error("Scan timed out after {attempts} polls")]
    Timeout { attempts: u32 },

    /// Network or malformed-JSON failure on an individual request.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The API answered with success=false on an otherwise healthy response.
    #[error("API error: {0}")]
    Api(String),

    /// Caller tore the poll driver down before a terminal state was observed.
    #[error("Polling cancelled")]
    Cancelled,

    /// Client-side input validation failed.
    #[error("Invalid input: {0}")]
    Invalid(String),
}

impl ScanError {
    /// Check if this error represents a not-found condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Failures the poll driver absorbs and retries within its attempt budget.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Api(_))
    }

    /// User-facing message for terminal failures.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound(_) => {
                "Scan not found. It may have expired — start a new scan.".to_string()
            }
            Self::Timeout { .. } => {
                "The scan is taking too long. Please try again.".to_string()
            }
            Self::Transport(_) | Self::Api(_) => {
                "A network error interrupted the scan. Please try again.".to_string()
            }
            Self::Cancelled => "Polling cancelled.".to_string(),
            Self::Invalid(msg) => msg.clone(),
        }
    }
}

impl From<reqwest::Error> for ScanError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ScanError {
    fn from(err: serde_json::Error) -> Self {
        Self::Transport(format!("malformed response body: {err}"))
    }
}
