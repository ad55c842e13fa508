// Endpoint descriptors and request building

use anyhow::Context;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Request};
use serde_json::Value;

/// HTTP method of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
            HttpMethod::Patch => Method::PATCH,
        }
    }
}

/// Where endpoint parameters go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParametersEncoding {
    /// URL query string
    Query,
    /// `application/x-www-form-urlencoded` body
    UrlEncoded,
    /// `application/json` body
    #[default]
    Json,
}

/// Describes one API call
pub trait Endpoint {
    /// Path relative to the client's base URL
    fn path(&self) -> String;

    fn method(&self) -> HttpMethod {
        HttpMethod::Get
    }

    fn parameters(&self) -> Option<Value> {
        None
    }

    fn encoding(&self) -> ParametersEncoding {
        ParametersEncoding::Json
    }
}

/// Join base URL and endpoint path with exactly one `/`
pub fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, path)
    }
}

/// Build a `reqwest::Request` for an endpoint
pub fn build_request<E: Endpoint + ?Sized>(
    client: &Client,
    base_url: &str,
    common_headers: &HeaderMap,
    endpoint: &E,
) -> anyhow::Result<Request> {
    let url = join_url(base_url, &endpoint.path());
    let mut builder = client
        .request(endpoint.method().into(), &url)
        .headers(common_headers.clone());

    if let Some(params) = endpoint.parameters() {
        builder = match endpoint.encoding() {
            ParametersEncoding::Query => builder.query(&flatten_params(&params)?),
            ParametersEncoding::UrlEncoded => builder.form(&flatten_params(&params)?),
            ParametersEncoding::Json => builder.json(&params),
        };
    }

    builder
        .build()
        .with_context(|| format!("Failed to build request for {}", url))
}

/// Query/form encoders need flat key-value pairs
fn flatten_params(params: &Value) -> anyhow::Result<Vec<(String, String)>> {
    let object = params
        .as_object()
        .context("Query and form parameters must be a JSON object")?;

    let mut pairs = Vec::with_capacity(object.len());
    for (key, value) in object {
        match value {
            Value::Null => {}
            Value::String(s) => pairs.push((key.clone(), s.clone())),
            Value::Bool(_) | Value::Number(_) => pairs.push((key.clone(), value.to_string())),
            Value::Array(items) => {
                for item in items {
                    let item = match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    pairs.push((key.clone(), item));
                }
            }
            Value::Object(_) => anyhow::bail!("Nested object parameter '{}' cannot be encoded", key),
        }
    }
    Ok(pairs)
}
