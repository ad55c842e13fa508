// Request/response debug logging

use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::Request;

use crate::config::DebugMode;

/// Debug logger for outgoing requests and their responses
///
/// Supports three modes:
/// - off: logging disabled
/// - errors: only failed exchanges are logged
/// - all: every exchange is logged
#[derive(Debug, Clone)]
pub struct DebugLogger {
    mode: DebugMode,
}

impl DebugLogger {
    pub fn new(mode: DebugMode) -> Self {
        Self { mode }
    }

    /// Log a request right before it is sent (all mode only)
    pub fn log_request(&self, request_id: &str, request: &Request) {
        if self.mode != DebugMode::All {
            return;
        }

        tracing::debug!(
            request_id,
            method = %request.method(),
            url = %request.url(),
            headers = ?masked_headers(request.headers()),
            body = %body_preview(request.body().and_then(|b| b.as_bytes())),
            "Request"
        );
    }

    /// Log a response status and body
    pub fn log_response(&self, request_id: &str, url: &str, status: u16, body: &[u8]) {
        let is_error = !(200..300).contains(&status);
        match self.mode {
            DebugMode::Off => {}
            DebugMode::Errors if !is_error => {}
            _ => {
                tracing::debug!(
                    request_id,
                    url,
                    status,
                    body = %body_preview(Some(body)),
                    "Response"
                );
            }
        }
    }
}

/// Header dump with credentials hidden
fn masked_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if name == AUTHORIZATION {
                mask_bearer(value.to_str().unwrap_or_default())
            } else {
                value.to_str().unwrap_or("<binary>").to_string()
            };
            (name.to_string(), shown)
        })
        .collect()
}

/// Keep the scheme and a short token prefix
fn mask_bearer(value: &str) -> String {
    match value.split_once(' ') {
        Some((scheme, token)) => {
            let prefix: String = token.chars().take(4).collect();
            format!("{} {}...", scheme, prefix)
        }
        None => "***".to_string(),
    }
}

fn body_preview(body: Option<&[u8]>) -> String {
    const MAX_PREVIEW: usize = 2048;
    match body {
        None => "- Empty -".to_string(),
        Some(bytes) if bytes.is_empty() => "- Empty -".to_string(),
        Some(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            if text.chars().count() > MAX_PREVIEW {
                let cut: String = text.chars().take(MAX_PREVIEW).collect();
                format!("{}... ({} bytes)", cut, bytes.len())
            } else {
                text.into_owned()
            }
        }
    }
}
