// Token provider capabilities consumed by the refresh interceptor

use async_trait::async_trait;

use super::types::TokenPair;
use crate::error::ApiError;

/// Exchanges a refresh token for a new token pair
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError>;
}

/// Everything the interceptor needs from the host application
///
/// Token reads may happen concurrently with the single writer (the
/// interceptor's refresh completion), so implementations need interior
/// mutability with read-after-write visibility.
#[async_trait]
pub trait TokenProvider: Send + Sync + 'static {
    fn access_token(&self) -> Option<String>;

    fn refresh_token(&self) -> Option<String>;

    fn set_tokens(&self, tokens: TokenPair);

    fn is_auth_exempt(&self, path: &str) -> bool;

    fn is_refresh_exempt(&self, path: &str) -> bool;

    /// Session teardown; only the interceptor calls this
    fn logout(&self);

    async fn get_new_token(&self, refresh_token: &str) -> Result<TokenPair, ApiError>;
}
