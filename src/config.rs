use anyhow::{Context, Result};
use clap::Parser;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// OAuth API client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to request, relative to the base URL
    pub path: String,

    /// API base URL
    #[arg(short = 'b', long, env = "API_BASE_URL")]
    pub base_url: Option<String>,

    /// Token refresh URL
    #[arg(short = 'r', long, env = "API_REFRESH_URL")]
    pub refresh_url: Option<String>,

    /// Paths that never receive a bearer token (comma-separated)
    #[arg(long, env = "AUTH_EXEMPT_PATHS", default_value = "")]
    pub auth_exempt_paths: String,

    /// Paths whose 401 never triggers a refresh (comma-separated)
    #[arg(long, env = "REFRESH_EXEMPT_PATHS", default_value = "")]
    pub refresh_exempt_paths: String,

    /// Headers sent with every request (Name:Value,...)
    #[arg(long, env = "API_COMMON_HEADERS", default_value = "")]
    pub common_headers: String,

    /// Send the request without bearer token handling
    #[arg(long)]
    pub unauthenticated: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Debug mode (off, errors, all)
    #[arg(long, env = "DEBUG_MODE", default_value = "off")]
    pub debug_mode: String,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "60")]
    pub http_timeout: u64,

    /// HTTP max retries for transient failures
    #[arg(long, env = "HTTP_MAX_RETRIES", default_value = "0")]
    pub http_retries: u32,
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    // Endpoints
    pub base_url: String,
    pub refresh_url: String,

    // Path policy
    pub auth_exempt_paths: Vec<String>,
    pub refresh_exempt_paths: Vec<String>,

    // Headers attached to every request
    pub common_headers: Vec<(String, String)>,

    // HTTP client
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,
    pub http_max_retries: u32,
    pub retry_base_delay_ms: u64,

    // Debug
    pub debug_mode: DebugMode,
    pub log_level: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DebugMode {
    Off,
    Errors,
    All,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            refresh_url: String::new(),
            auth_exempt_paths: Vec::new(),
            refresh_exempt_paths: Vec::new(),
            common_headers: Vec::new(),
            http_connect_timeout: 30,
            http_request_timeout: 60,
            http_max_retries: 0,
            retry_base_delay_ms: 1000,
            debug_mode: DebugMode::Off,
            log_level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Build configuration from parsed CLI arguments (CLI > ENV > defaults)
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let base_url = args
            .base_url
            .clone()
            .context("API_BASE_URL is required (use -b or set API_BASE_URL env var)")?;

        let refresh_url = args
            .refresh_url
            .clone()
            .unwrap_or_else(|| crate::endpoint::join_url(&base_url, "auth/refresh"));

        Ok(ClientConfig {
            base_url,
            refresh_url,
            auth_exempt_paths: parse_list(&args.auth_exempt_paths),
            refresh_exempt_paths: parse_list(&args.refresh_exempt_paths),
            common_headers: parse_header_pairs(&args.common_headers)?,
            http_connect_timeout: std::env::var("HTTP_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            http_request_timeout: args.http_timeout,
            http_max_retries: args.http_retries,
            retry_base_delay_ms: std::env::var("HTTP_RETRY_BASE_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),
            debug_mode: parse_debug_mode(&args.debug_mode),
            log_level: args.log_level.clone(),
        })
    }

    /// Load configuration from all sources with priority: CLI > ENV > defaults
    pub fn load() -> Result<(Self, CliArgs)> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();
        let config = Self::from_args(&args)?;
        Ok((config, args))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            anyhow::bail!("API_BASE_URL must not be empty");
        }
        reqwest::Url::parse(&self.base_url)
            .with_context(|| format!("API_BASE_URL is not a valid URL: {}", self.base_url))?;

        if !self.refresh_url.is_empty() {
            reqwest::Url::parse(&self.refresh_url).with_context(|| {
                format!("API_REFRESH_URL is not a valid URL: {}", self.refresh_url)
            })?;
        }

        self.header_map()?;
        Ok(())
    }

    /// Common headers as a `HeaderMap`
    pub fn header_map(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.common_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("Invalid header name: {}", name))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("Invalid value for header {}", name))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

/// Split a comma-separated list, dropping blanks
fn parse_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `Name:Value,Name2:Value2`
fn parse_header_pairs(s: &str) -> Result<Vec<(String, String)>> {
    parse_list(s)
        .into_iter()
        .map(|pair| {
            let (name, value) = pair
                .split_once(':')
                .with_context(|| format!("Header must be Name:Value, got '{}'", pair))?;
            Ok((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Parse debug mode from string
fn parse_debug_mode(s: &str) -> DebugMode {
    match s.to_lowercase().as_str() {
        "errors" => DebugMode::Errors,
        "all" => DebugMode::All,
        _ => DebugMode::Off,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["oauth-api-client", "/users/me"];
        argv.extend_from_slice(extra);
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list("/login, /refresh ,,"), vec!["/login", "/refresh"]);
        assert!(parse_list("").is_empty());
        assert!(parse_list(" , ").is_empty());
    }

    #[test]
    fn test_parse_header_pairs() {
        let pairs = parse_header_pairs("X-App:ios, Accept-Language: sr").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("X-App".to_string(), "ios".to_string()),
                ("Accept-Language".to_string(), "sr".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_header_pairs_rejects_missing_colon() {
        assert!(parse_header_pairs("X-App").is_err());
    }

    #[test]
    fn test_parse_debug_mode() {
        assert_eq!(parse_debug_mode("off"), DebugMode::Off);
        assert_eq!(parse_debug_mode("errors"), DebugMode::Errors);
        assert_eq!(parse_debug_mode("all"), DebugMode::All);
        assert_eq!(parse_debug_mode("invalid"), DebugMode::Off);
        assert_eq!(parse_debug_mode(""), DebugMode::Off);
    }

    #[test]
    fn test_parse_debug_mode_case_insensitive() {
        assert_eq!(parse_debug_mode("ERRORS"), DebugMode::Errors);
        assert_eq!(parse_debug_mode("All"), DebugMode::All);
        assert_eq!(parse_debug_mode("OFF"), DebugMode::Off);
    }

    #[test]
    fn test_from_args() {
        let config = ClientConfig::from_args(&args(&[
            "-b",
            "https://api.example.com/v1",
            "--auth-exempt-paths",
            "/auth/login,/auth/refresh",
            "--refresh-exempt-paths",
            "/auth/",
            "--common-headers",
            "X-App:ios",
            "--debug-mode",
            "errors",
            "--http-retries",
            "2",
        ]))
        .unwrap();

        assert_eq!(config.base_url, "https://api.example.com/v1");
        assert_eq!(config.refresh_url, "https://api.example.com/v1/auth/refresh");
        assert_eq!(config.auth_exempt_paths, vec!["/auth/login", "/auth/refresh"]);
        assert_eq!(config.refresh_exempt_paths, vec!["/auth/"]);
        assert_eq!(config.debug_mode, DebugMode::Errors);
        assert_eq!(config.http_max_retries, 2);
        config.validate().unwrap();
    }

    #[test]
    fn test_from_args_requires_base_url() {
        // Only meaningful when the variable is not set in the test environment
        if std::env::var("API_BASE_URL").is_err() {
            assert!(ClientConfig::from_args(&args(&[])).is_err());
        }
    }

    #[test]
    fn test_validate() {
        assert!(ClientConfig::new("").validate().is_err());
        assert!(ClientConfig::new("not a url").validate().is_err());
        assert!(ClientConfig::new("https://api.example.com").validate().is_ok());

        let mut config = ClientConfig::new("https://api.example.com");
        config.common_headers = vec![("Bad Header".to_string(), "x".to_string())];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_header_map() {
        let mut config = ClientConfig::new("https://api.example.com");
        config.common_headers = vec![("X-App".to_string(), "ios".to_string())];
        let headers = config.header_map().unwrap();
        assert_eq!(headers["x-app"], "ios");
    }
}
