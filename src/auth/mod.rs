// Authentication module
// Token storage, refresh, and the request interceptor that ties them together

mod interceptor;
mod provider;
mod refresh;
mod store;
mod types;

pub use interceptor::RefreshInterceptor;
pub use provider::{TokenProvider, TokenRefresher};
pub use refresh::HttpTokenRefresher;
pub use store::{LogoutHook, TokenStore};
pub use types::{PathPolicy, RetryDecision, TokenPair};
