// Token refresh over HTTP

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::provider::TokenRefresher;
use super::types::{RefreshRequest, TokenPair};
use crate::error::ApiError;

/// Refreshes tokens by POSTing `{"refreshToken": ...}` to a fixed URL
pub struct HttpTokenRefresher {
    client: Client,
    refresh_url: String,
}

impl HttpTokenRefresher {
    pub fn new(refresh_url: impl Into<String>, timeout: u64) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            refresh_url: refresh_url.into(),
        })
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        tracing::info!(url = %self.refresh_url, "Refreshing access token...");

        let response = self
            .client
            .post(&self.refresh_url)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(|e| ApiError::RefreshFailed(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(
                status = status.as_u16(),
                body = %error_text,
                "Token refresh rejected"
            );
            return Err(ApiError::RefreshFailed(format!(
                "{} - {}",
                status, error_text
            )));
        }

        let tokens: TokenPair = response
            .json()
            .await
            .map_err(|e| ApiError::RefreshFailed(format!("invalid refresh response: {}", e)))?;

        if tokens.access_token.as_deref().map_or(true, str::is_empty) {
            return Err(ApiError::RefreshFailed(
                "refresh response does not contain accessToken".to_string(),
            ));
        }

        tracing::info!("Access token refreshed");
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_refresh_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth/refresh")
            .match_body(mockito::Matcher::Json(
                serde_json::json!({"refreshToken": "R1"}),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"accessToken":"A2","refreshToken":"R2"}"#)
            .create_async()
            .await;

        let refresher =
            HttpTokenRefresher::new(format!("{}/oauth/refresh", server.url()), 5).unwrap();
        let tokens = refresher.refresh("R1").await.unwrap();

        assert_eq!(tokens, TokenPair::new("A2", "R2"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth/refresh")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant"}"#)
            .create_async()
            .await;

        let refresher =
            HttpTokenRefresher::new(format!("{}/oauth/refresh", server.url()), 5).unwrap();
        let err = refresher.refresh("R1").await.unwrap_err();

        match err {
            ApiError::RefreshFailed(msg) => assert!(msg.contains("invalid_grant")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_refresh_missing_access_token() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth/refresh")
            .with_status(200)
            .with_body(r#"{"refreshToken":"R2"}"#)
            .create_async()
            .await;

        let refresher =
            HttpTokenRefresher::new(format!("{}/oauth/refresh", server.url()), 5).unwrap();
        let err = refresher.refresh("R1").await.unwrap_err();
        assert!(matches!(err, ApiError::RefreshFailed(_)));
    }
}
