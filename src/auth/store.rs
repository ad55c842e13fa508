use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};

use super::provider::{TokenProvider, TokenRefresher};
use super::types::{PathPolicy, TokenPair};
use crate::error::ApiError;

/// Host callback run on logout (clear session, notify UI, ...)
pub type LogoutHook = Arc<dyn Fn() + Send + Sync>;

/// Token store
/// Owns the session's token pair and exemption policy
pub struct TokenStore {
    /// Current tokens
    tokens: RwLock<TokenPair>,

    /// Exempt paths
    policy: PathPolicy,

    /// Refresh operation
    refresher: Arc<dyn TokenRefresher>,

    /// Host logout side effect
    on_logout: Option<LogoutHook>,
}

impl TokenStore {
    pub fn new(tokens: TokenPair, policy: PathPolicy, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            tokens: RwLock::new(tokens),
            policy,
            refresher,
            on_logout: None,
        }
    }

    pub fn with_logout_hook(mut self, hook: LogoutHook) -> Self {
        self.on_logout = Some(hook);
        self
    }

    /// Snapshot of the current tokens
    pub fn tokens(&self) -> TokenPair {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn policy(&self) -> &PathPolicy {
        &self.policy
    }
}

#[async_trait]
impl TokenProvider for TokenStore {
    fn access_token(&self) -> Option<String> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .access_token
            .clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .refresh_token
            .clone()
    }

    fn set_tokens(&self, tokens: TokenPair) {
        let mut guard = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        *guard = tokens;
    }

    fn is_auth_exempt(&self, path: &str) -> bool {
        self.policy.is_auth_exempt(path)
    }

    fn is_refresh_exempt(&self, path: &str) -> bool {
        self.policy.is_refresh_exempt(path)
    }

    fn logout(&self) {
        tracing::info!("Logging out, clearing stored tokens");
        self.set_tokens(TokenPair::default());
        if let Some(ref hook) = self.on_logout {
            hook();
        }
    }

    async fn get_new_token(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        self.refresher.refresh(refresh_token).await
    }
}
