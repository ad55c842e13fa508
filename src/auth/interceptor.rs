// Bearer attachment and coordinated refresh-on-401

use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Request, StatusCode};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;

use super::provider::TokenProvider;
use super::types::RetryDecision;
use crate::error::ApiError;

/// Refresh coordination state
///
/// `pending` is non-empty only while `is_refreshing` is set.
#[derive(Default)]
struct RefreshState {
    is_refreshing: bool,
    pending: VecDeque<oneshot::Sender<RetryDecision>>,
}

/// Request interceptor
/// Attaches the bearer token and serializes token refreshes so that any
/// number of concurrent 401s share a single refresh
pub struct RefreshInterceptor<P: TokenProvider> {
    provider: Arc<P>,
    state: Arc<Mutex<RefreshState>>,
}

impl<P: TokenProvider> Clone for RefreshInterceptor<P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            state: self.state.clone(),
        }
    }
}

impl<P: TokenProvider> RefreshInterceptor<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            state: Arc::new(Mutex::new(RefreshState::default())),
        }
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Whether a refresh is currently in flight
    pub fn is_refreshing(&self) -> bool {
        self.lock_state().is_refreshing
    }

    /// Number of requests waiting on the in-flight refresh
    pub fn pending_count(&self) -> usize {
        self.lock_state().pending.len()
    }

    /// Attach `Authorization: Bearer <token>` unless the URL is auth-exempt
    /// or there is no access token. Never fails.
    pub fn adapt(&self, request: &mut Request) {
        if self.provider.is_auth_exempt(request.url().as_str()) {
            return;
        }
        let Some(token) = self.provider.access_token() else {
            return;
        };

        match HeaderValue::from_str(&format!("Bearer {}", token)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers_mut().insert(AUTHORIZATION, value);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Access token is not a valid header value, sending without it");
            }
        }
    }

    /// Decide whether a failed request should be resent
    ///
    /// Resolves once the in-flight refresh (if any) completes.
    pub async fn retry(
        &self,
        status: Option<StatusCode>,
        url: &str,
        error: ApiError,
    ) -> RetryDecision {
        if status != Some(StatusCode::UNAUTHORIZED) || self.provider.is_refresh_exempt(url) {
            return RetryDecision::DoNotRetry(error);
        }

        if !has_token(self.provider.refresh_token()) {
            tracing::warn!(url = %url, "Received 401 with no refresh token, logging out");
            self.provider.logout();
            return RetryDecision::DoNotRetry(ApiError::Unauthorized);
        }

        let (tx, rx) = oneshot::channel();
        let launch = {
            let mut state = self.lock_state();
            state.pending.push_back(tx);
            tracing::debug!(url = %url, queued = state.pending.len(), "Request waiting for token refresh");
            if state.is_refreshing {
                false
            } else {
                state.is_refreshing = true;
                true
            }
        };

        if launch {
            self.spawn_refresh();
        }

        rx.await.unwrap_or_else(|_| {
            RetryDecision::DoNotRetry(ApiError::RefreshFailed(
                "refresh task ended without a result".to_string(),
            ))
        })
    }

    /// Run the refresh on its own task, with a supervisor that fails the
    /// batch if that task panics or is cancelled
    fn spawn_refresh(&self) {
        let this = self.clone();
        let handle = tokio::spawn(async move {
            this.run_refresh().await;
        });

        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Token refresh task aborted, logging out");
                this.fail_refresh(format!("refresh task aborted: {}", e));
            }
        });
    }

    async fn run_refresh(&self) {
        tracing::info!("Access token rejected, starting token refresh");

        // Read under Refreshing so a late 401 never reuses a token an
        // earlier cycle already rotated away
        let refresh_token = match self.provider.refresh_token() {
            Some(token) if !token.is_empty() => token,
            _ => {
                tracing::warn!("Refresh token disappeared before refresh, logging out");
                self.fail_refresh("no refresh token available".to_string());
                return;
            }
        };

        match self.provider.get_new_token(&refresh_token).await {
            Ok(tokens) => {
                self.provider.set_tokens(tokens);
                let pending = self.finish_refresh();
                tracing::info!(released = pending.len(), "Token refresh succeeded, retrying requests");
                for waiter in pending {
                    let _ = waiter.send(RetryDecision::Retry);
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Token refresh failed, logging out");
                let message = match e {
                    ApiError::RefreshFailed(msg) => msg,
                    other => other.to_string(),
                };
                self.fail_refresh(message);
            }
        }
    }

    /// Log out, return to idle and fail every waiter with the same error
    fn fail_refresh(&self, message: String) {
        self.provider.logout();
        let pending = self.finish_refresh();
        for waiter in pending {
            let _ = waiter.send(RetryDecision::DoNotRetry(ApiError::RefreshFailed(
                message.clone(),
            )));
        }
    }

    /// Return to idle and take the batch in one critical section
    fn finish_refresh(&self) -> VecDeque<oneshot::Sender<RetryDecision>> {
        let mut state = self.lock_state();
        state.is_refreshing = false;
        std::mem::take(&mut state.pending)
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn has_token(token: Option<String>) -> bool {
    token.map_or(false, |t| !t.is_empty())
}
