// Authentication types

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Access/refresh token pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token: Some(refresh_token.into()),
        }
    }
}

/// URL substrings excluded from bearer attachment or from refresh-on-401
#[derive(Debug, Clone, Default)]
pub struct PathPolicy {
    /// Requests to these paths never get a bearer token
    pub auth_exempt_paths: Vec<String>,

    /// A 401 on these paths fails immediately without a refresh
    pub refresh_exempt_paths: Vec<String>,
}

impl PathPolicy {
    pub fn new(auth_exempt_paths: Vec<String>, refresh_exempt_paths: Vec<String>) -> Self {
        Self {
            auth_exempt_paths,
            refresh_exempt_paths,
        }
    }

    pub fn is_auth_exempt(&self, path: &str) -> bool {
        contains_any(path, &self.auth_exempt_paths)
    }

    pub fn is_refresh_exempt(&self, path: &str) -> bool {
        contains_any(path, &self.refresh_exempt_paths)
    }
}

fn contains_any(path: &str, sub_paths: &[String]) -> bool {
    sub_paths
        .iter()
        .any(|sub| !sub.is_empty() && path.contains(sub.as_str()))
}

/// Outcome delivered to a request that failed
#[derive(Debug)]
pub enum RetryDecision {
    /// Resend the request; token state has been refreshed
    Retry,

    /// Give up and surface this error
    DoNotRetry(ApiError),
}

impl RetryDecision {
    pub fn is_retry(&self) -> bool {
        matches!(self, RetryDecision::Retry)
    }
}

/// Refresh request body
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}
