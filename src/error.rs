// Error handling module
// Defines the client error taxonomy and failure classification

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

/// Errors surfaced to callers of the API client
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport could not reach the host
    #[error("No network connection")]
    NoConnectivity,

    /// Terminal 401: refresh was not attempted or not possible
    #[error("Unauthorized")]
    Unauthorized,

    /// The token refresh operation itself failed
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// Structured error payload decoded from a failed response
    #[error("Server error: {status} - {message}")]
    ServerMessage {
        status: u16,
        message: String,
        code: Option<String>,
    },

    /// Status or payload could not be classified
    #[error("Unclassified error (status: {status:?}): {message}")]
    Unclassified { status: Option<u16>, message: String },

    /// Client-side failure (bad URL, non-clonable body, ...)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// True for errors after which the host should route the user to re-authentication
    pub fn is_terminal_auth(&self) -> bool {
        matches!(self, ApiError::Unauthorized | ApiError::RefreshFailed(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            return ApiError::NoConnectivity;
        }
        ApiError::Unclassified {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

/// Error payload shape returned by the backend
///
/// Backends disagree on the schema, so the payload type is chosen per call.
/// Only `message` drives classification; `code` is optional.
pub trait ErrorPayload: DeserializeOwned {
    fn message(&self) -> Option<String>;

    fn code(&self) -> Option<String> {
        None
    }
}

/// `{"message": "...", "code": "..."}` with both fields optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefaultErrorPayload {
    pub message: Option<String>,
    #[serde(default, deserialize_with = "code_as_string")]
    pub code: Option<String>,
}

impl ErrorPayload for DefaultErrorPayload {
    fn message(&self) -> Option<String> {
        self.message.clone()
    }

    fn code(&self) -> Option<String> {
        self.code.clone()
    }
}

/// Accept both `"code": "E42"` and `"code": 42`
fn code_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Classify a non-success HTTP response
///
/// 401 maps to `Unauthorized`; everything else is decoded as `E` and becomes
/// `ServerMessage` when a message is present, `Unclassified` otherwise.
pub fn classify_failure<E: ErrorPayload>(status: u16, body: &[u8]) -> ApiError {
    if status == 401 {
        return ApiError::Unauthorized;
    }

    match serde_json::from_slice::<E>(body) {
        Ok(payload) => match payload.message() {
            Some(message) => ApiError::ServerMessage {
                status,
                message,
                code: payload.code(),
            },
            None => ApiError::Unclassified {
                status: Some(status),
                message: String::from_utf8_lossy(body).into_owned(),
            },
        },
        Err(e) => {
            tracing::debug!(status, error = %e, "Failed to decode error payload");
            ApiError::Unclassified {
                status: Some(status),
                message: String::from_utf8_lossy(body).into_owned(),
            }
        }
    }
}
