use anyhow::Context;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Client, Request, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{RefreshInterceptor, RetryDecision, TokenProvider};
use crate::config::ClientConfig;
use crate::debug::DebugLogger;
use crate::endpoint::{self, Endpoint};
use crate::error::{classify_failure, ApiError, ErrorPayload};

/// Upper bound on a single backoff sleep before jitter
const MAX_BACKOFF_MS: u64 = 60_000;

/// HTTP API client with bearer-token handling and retry logic
pub struct ApiClient<P: TokenProvider> {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// Base URL endpoint paths are appended to
    base_url: String,

    /// Headers attached to every request
    common_headers: HeaderMap,

    /// Bearer attachment and refresh coordination
    interceptor: RefreshInterceptor<P>,

    /// Request/response logging
    debug_logger: DebugLogger,

    /// Maximum number of transient-failure retries
    max_retries: u32,

    /// Base delay for exponential backoff (milliseconds)
    base_delay_ms: u64,
}

/// Status and body of a successful exchange
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl<P: TokenProvider> ApiClient<P> {
    /// Create a new API client
    pub fn new(config: &ClientConfig, provider: Arc<P>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.http_connect_timeout))
            .timeout(Duration::from_secs(config.http_request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            common_headers: config.header_map()?,
            interceptor: RefreshInterceptor::new(provider),
            debug_logger: DebugLogger::new(config.debug_mode.clone()),
            max_retries: config.http_max_retries,
            base_delay_ms: config.retry_base_delay_ms,
        })
    }

    pub fn interceptor(&self) -> &RefreshInterceptor<P> {
        &self.interceptor
    }

    /// Call an endpoint and decode its JSON body as `T`
    ///
    /// Failed responses are decoded with the error payload type `E`.
    pub async fn request<T, E, Ep>(&self, endpoint: &Ep, authenticated: bool) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        E: ErrorPayload,
        Ep: Endpoint + ?Sized,
    {
        let response = self.send_endpoint::<E, Ep>(endpoint, authenticated).await?;
        serde_json::from_slice(&response.body).map_err(|e| ApiError::Unclassified {
            status: Some(response.status.as_u16()),
            message: format!("Failed to decode response: {}", e),
        })
    }

    /// Call an endpoint whose response body is irrelevant
    pub async fn request_unit<E, Ep>(&self, endpoint: &Ep, authenticated: bool) -> Result<(), ApiError>
    where
        E: ErrorPayload,
        Ep: Endpoint + ?Sized,
    {
        self.send_endpoint::<E, Ep>(endpoint, authenticated).await?;
        Ok(())
    }

    async fn send_endpoint<E, Ep>(&self, endpoint: &Ep, authenticated: bool) -> Result<RawResponse, ApiError>
    where
        E: ErrorPayload,
        Ep: Endpoint + ?Sized,
    {
        let request =
            endpoint::build_request(&self.client, &self.base_url, &self.common_headers, endpoint)?;
        self.execute::<E>(request, authenticated).await
    }

    /// Execute a prepared request
    /// Automatically handles:
    /// - 401: one coordinated token refresh, then a single resend
    /// - 429 / 5xx / connection errors: exponential backoff up to `max_retries`
    pub async fn execute<E: ErrorPayload>(
        &self,
        request: Request,
        authenticated: bool,
    ) -> Result<RawResponse, ApiError> {
        let request_id = uuid::Uuid::new_v4().to_string()[..8].to_string();
        let url = request.url().to_string();
        let mut attempt = 0;
        let mut refreshed = false;

        tracing::debug!(
            request_id = %request_id,
            method = %request.method(),
            url = %url,
            authenticated,
            "Sending HTTP request"
        );

        loop {
            // Clone the request for this attempt
            let mut req = request.try_clone().ok_or_else(|| {
                ApiError::Internal(anyhow::anyhow!("Request body is not cloneable"))
            })?;

            if authenticated {
                self.interceptor.adapt(&mut req);
            }
            self.debug_logger.log_request(&request_id, &req);

            match self.client.execute(req).await {
                Ok(response) => {
                    let status = response.status();
                    let body = response.bytes().await.map_err(ApiError::from)?;
                    self.debug_logger
                        .log_response(&request_id, &url, status.as_u16(), &body);

                    if status.is_success() {
                        tracing::debug!(request_id = %request_id, status = %status, "Request successful");
                        return Ok(RawResponse { status, body });
                    }

                    if status == StatusCode::UNAUTHORIZED && authenticated {
                        if refreshed {
                            tracing::warn!(request_id = %request_id, url = %url, "Still unauthorized after token refresh");
                            return Err(ApiError::Unauthorized);
                        }

                        match self
                            .interceptor
                            .retry(Some(status), &url, ApiError::Unauthorized)
                            .await
                        {
                            RetryDecision::Retry => {
                                tracing::debug!(request_id = %request_id, "Resending request with refreshed token");
                                refreshed = true;
                                continue;
                            }
                            RetryDecision::DoNotRetry(e) => return Err(e),
                        }
                    }

                    if is_transient(status) && attempt < self.max_retries {
                        let delay = self.calculate_backoff_delay(attempt);
                        tracing::warn!(
                            "Received {}, retrying after {}ms (attempt {}/{})",
                            status,
                            delay,
                            attempt + 1,
                            self.max_retries
                        );
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                        attempt += 1;
                        continue;
                    }

                    tracing::warn!(
                        request_id = %request_id,
                        status = status.as_u16(),
                        url = %url,
                        attempt = attempt + 1,
                        "HTTP request failed with error response"
                    );
                    return Err(classify_failure::<E>(status.as_u16(), &body));
                }

                Err(e) => {
                    let error_kind = if e.is_timeout() {
                        "timeout"
                    } else if e.is_connect() {
                        "connection_failed"
                    } else if e.is_request() {
                        "request_error"
                    } else if e.is_body() {
                        "body_error"
                    } else {
                        "unknown"
                    };

                    tracing::warn!(
                        request_id = %request_id,
                        error_kind,
                        error = %e,
                        url = %url,
                        attempt = attempt + 1,
                        "HTTP request error"
                    );

                    if (e.is_connect() || e.is_timeout()) && attempt < self.max_retries {
                        let delay = self.calculate_backoff_delay(attempt);
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                        attempt += 1;
                        continue;
                    }

                    return Err(ApiError::from(e));
                }
            }
        }
    }

    /// Calculate exponential backoff delay
    fn calculate_backoff_delay(&self, attempt: u32) -> u64 {
        // base_delay * 2^attempt, capped, plus up to 10% jitter
        let delay = 2_u64
            .checked_pow(attempt)
            .and_then(|factor| self.base_delay_ms.checked_mul(factor))
            .unwrap_or(MAX_BACKOFF_MS)
            .min(MAX_BACKOFF_MS);
        let jitter = (delay as f64 * 0.1 * rand::random::<f64>()) as u64;
        delay + jitter
    }
}

fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}
