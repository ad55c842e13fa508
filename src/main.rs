use anyhow::{Context, Result};
use std::sync::Arc;

use oauth_api_client::config::ClientConfig;
use oauth_api_client::{
    ApiClient, DefaultErrorPayload, Endpoint, HttpTokenRefresher, PathPolicy, TokenPair,
    TokenStore,
};

/// GET endpoint built from the command line path
struct PathEndpoint(String);

impl Endpoint for PathEndpoint {
    fn path(&self) -> String {
        self.0.clone()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let (config, args) = ClientConfig::load()?;
    config.validate()?;

    // Initialize logging with a configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::debug!("Debug mode: {:?}", config.debug_mode);

    let tokens = TokenPair {
        access_token: std::env::var("ACCESS_TOKEN").ok(),
        refresh_token: std::env::var("REFRESH_TOKEN").ok(),
    };
    if tokens.access_token.is_none() && !args.unauthenticated {
        tracing::warn!("ACCESS_TOKEN is not set, request will be sent without a bearer token");
    }

    let refresher = HttpTokenRefresher::new(config.refresh_url.clone(), config.http_request_timeout)?;
    let policy = PathPolicy::new(
        config.auth_exempt_paths.clone(),
        config.refresh_exempt_paths.clone(),
    );
    let store = TokenStore::new(tokens, policy, Arc::new(refresher)).with_logout_hook(Arc::new(
        || tracing::warn!("Session ended, log in again to obtain new tokens"),
    ));
    let store = Arc::new(store);

    let client = ApiClient::new(&config, store.clone())?;
    tracing::info!("HTTP client initialized for {}", config.base_url);

    let body: serde_json::Value = client
        .request::<_, DefaultErrorPayload, _>(&PathEndpoint(args.path.clone()), !args.unauthenticated)
        .await
        .with_context(|| format!("Request to {} failed", args.path))?;

    println!("{}", serde_json::to_string_pretty(&body)?);

    // Surface rotated tokens so the caller can persist them
    let current = store.tokens();
    if current.access_token != std::env::var("ACCESS_TOKEN").ok() {
        tracing::info!("Access token was refreshed during this session");
    }

    Ok(())
}
