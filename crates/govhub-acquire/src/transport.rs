//! HTTP transport with outcome classification
//!
//! One request in, one [`FetchOutcome`] out. The classification drives the
//! retry policy: 403/404 kill the endpoint, 429 asks for a longer wait,
//! timeouts and connection errors are worth retrying, and anything else
//! non-2xx is retried until the budget runs out.

use reqwest::{Client, StatusCode};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::Result;
use govhub_common::config::DownloadSettings;

const USER_AGENT: &str = "GovHub-Data-Acquirer/0.1";

/// Result of one transport call, never silently coerced.
#[derive(Debug)]
pub enum FetchOutcome {
    /// 2xx response, body not yet consumed
    Success(reqwest::Response),
    /// 429 with the server's suggested wait when it sent one
    RateLimited { wait: Option<Duration> },
    /// Worth another attempt (timeout, connection error, other non-2xx)
    Retryable(String),
    /// Do not retry this endpoint (403, 404)
    Fatal(String),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }

    /// Failure description for logs; empty for successes.
    pub fn reason(&self) -> String {
        match self {
            FetchOutcome::Success(_) => String::new(),
            FetchOutcome::RateLimited { wait } => match wait {
                Some(w) => format!("rate limited, retry after {}s", w.as_secs()),
                None => "rate limited".to_string(),
            },
            FetchOutcome::Retryable(reason) | FetchOutcome::Fatal(reason) => reason.clone(),
        }
    }
}

/// HTTP client issuing classified single requests.
#[derive(Debug, Clone)]
pub struct TransportClient {
    client: Client,
}

impl TransportClient {
    /// Build a client with the configured timeout.
    ///
    /// Certificate verification is intentionally relaxed: several government
    /// portals serve incomplete TLS chains and a malformed certificate must
    /// not fail the whole run.
    pub fn new(settings: &DownloadSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(Self { client })
    }

    /// Issue one GET request and classify the outcome.
    pub async fn fetch(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
        params: Option<&[(&str, String)]>,
    ) -> FetchOutcome {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(params) = params {
            request = request.query(params);
        }

        debug!(url, "issuing request");

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return FetchOutcome::Retryable(format!("timeout: {}", e));
            },
            Err(e) if e.is_connect() => {
                return FetchOutcome::Retryable(format!("connection error: {}", e));
            },
            Err(e) => {
                return FetchOutcome::Retryable(format!("request error: {}", e));
            },
        };

        let status = response.status();
        info!(url, status = %status, "response received");

        if let Some(length) = response.content_length() {
            debug!(size_mb = length as f64 / (1024.0 * 1024.0), "content length");
        }

        match status {
            StatusCode::FORBIDDEN => {
                warn!(url, "access denied (403), possible User-Agent block or auth requirement");
                FetchOutcome::Fatal(format!("access denied (403) for {}", url))
            },
            StatusCode::NOT_FOUND => {
                warn!(url, "resource not found (404)");
                FetchOutcome::Fatal(format!("resource not found (404): {}", url))
            },
            StatusCode::TOO_MANY_REQUESTS => {
                let wait = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(Duration::from_secs);
                FetchOutcome::RateLimited { wait }
            },
            s if s.is_success() => FetchOutcome::Success(response),
            s => FetchOutcome::Retryable(format!("HTTP error {} for {}", s, url)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
