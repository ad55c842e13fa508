// OAuth API client - library root

pub mod auth;
pub mod config;
pub mod debug;
pub mod endpoint;
pub mod error;
pub mod http_client;

pub use auth::{
    HttpTokenRefresher, PathPolicy, RefreshInterceptor, RetryDecision, TokenPair, TokenProvider,
    TokenRefresher, TokenStore,
};
pub use config::ClientConfig;
pub use endpoint::{Endpoint, HttpMethod, ParametersEncoding};
pub use error::{ApiError, DefaultErrorPayload, ErrorPayload};
pub use http_client::{ApiClient, RawResponse};
