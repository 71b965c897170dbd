use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;

use crate::domain::errors::BackendError;

pub struct HttpClientFactory;

impl HttpClientFactory {
    /// Client with transport timeouts only; callers log failures and move on
    pub fn create_client(timeout_seconds: u64, access_token: &str) -> Client {
        Client::builder()
            .default_headers(Self::bearer_headers(access_token))
            .pool_max_idle_per_host(5)
            .timeout(Duration::from_secs(timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("firehose-nozzle/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new())
    }

    /// Default headers carrying a bearer token, when one is configured
    pub fn bearer_headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if token.is_empty() {
            return headers;
        }
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }
}

/// Sends the request and turns non-2xx answers into `BackendError::Status`
pub async fn send_checked(request: RequestBuilder, endpoint: &str) -> anyhow::Result<Response> {
    let response = request.send().await?;
    check_status(response, endpoint).await
}

pub async fn check_status(response: Response, endpoint: &str) -> anyhow::Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(BackendError::Status {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body,
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_headers() {
        assert!(HttpClientFactory::bearer_headers("").is_empty());
        let headers = HttpClientFactory::bearer_headers("abc");
        assert_eq!(headers[AUTHORIZATION], "Bearer abc");
    }
}
