//! Failure taxonomy for calls that cross the HTTP boundary.

use shared::error::ApiErrorBody;
use thiserror::Error;

pub const NETWORK_FAILURE_MESSAGE: &str =
    "Could not reach the recommendation service; check the connection and retry.";
pub const GENERIC_FAILURE_MESSAGE: &str = "Operation failed.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("network failure: {0}")]
    Network(String),
    #[error("request rejected: {}", .detail.as_deref().unwrap_or("no detail"))]
    Validation { detail: Option<String> },
    #[error("not found: {}", .detail.as_deref().unwrap_or("no detail"))]
    NotFound { detail: Option<String> },
    #[error("unexpected response (status {status:?}): {}", .detail.as_deref().unwrap_or("no detail"))]
    Unknown {
        status: Option<u16>,
        detail: Option<String>,
    },
}

impl ClientError {
    /// Classifies a non-success response from its status and raw body.
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<ApiErrorBody>(body)
            .ok()
            .and_then(|parsed| parsed.detail_message());
        match status {
            400 | 409 | 422 => ClientError::Validation { detail },
            404 => ClientError::NotFound { detail },
            _ => ClientError::Unknown {
                status: Some(status),
                detail,
            },
        }
    }

    /// Server-provided detail, when the server sent one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ClientError::Network(_) => None,
            ClientError::Validation { detail } | ClientError::NotFound { detail } => {
                detail.as_deref()
            }
            ClientError::Unknown { detail, .. } => detail.as_deref(),
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ClientError::Network(_))
    }

    /// Server detail verbatim when present (for every class, `Unknown`
    /// included), otherwise the connectivity message for transport
    /// failures, otherwise `fallback`.
    pub fn describe(&self, fallback: &str) -> String {
        if let Some(detail) = self.detail() {
            return detail.to_string();
        }
        if self.is_network() {
            return NETWORK_FAILURE_MESSAGE.to_string();
        }
        fallback.to_string()
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() {
            ClientError::Network(err.to_string())
        } else if let Some(status) = err.status() {
            ClientError::Unknown {
                status: Some(status.as_u16()),
                detail: None,
            }
        } else {
            ClientError::Unknown {
                status: None,
                detail: None,
            }
        }
    }
}
