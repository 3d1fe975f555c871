//! Bounded retry policy around the transport client
//!
//! Constant-delay retries (not exponential, matching observed upstream
//! behavior): a retryable failure sleeps `delay` and tries again, a
//! rate-limit response sleeps twice that without consuming an attempt slot,
//! and a fatal outcome returns immediately.

use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::transport::FetchOutcome;
use govhub_common::config::DownloadSettings;

/// Retry policy with a fixed attempt budget and constant base delay.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn from_settings(settings: &DownloadSettings) -> Self {
        Self::new(settings.max_retries, settings.retry_delay())
    }

    /// Drive `attempt` until success, a fatal outcome, or budget exhaustion.
    ///
    /// Rate-limited responses wait `2 × delay` (or the server's suggested
    /// wait when longer) and do not count against the attempt budget. The
    /// attempt sequence is deterministic modulo timing.
    pub async fn run<F, Fut>(&self, mut attempt: F) -> FetchOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = FetchOutcome>,
    {
        let mut used = 0u32;
        let mut last = FetchOutcome::Retryable("no attempt made".to_string());

        while used < self.max_attempts {
            used += 1;
            info!(attempt = used, max_attempts = self.max_attempts, "fetch attempt");

            match attempt().await {
                FetchOutcome::Success(response) => {
                    return FetchOutcome::Success(response);
                },
                FetchOutcome::Fatal(reason) => {
                    warn!(%reason, "fatal outcome, not retrying");
                    return FetchOutcome::Fatal(reason);
                },
                FetchOutcome::RateLimited { wait } => {
                    // Rate-limit waits are not failures; give the slot back.
                    used -= 1;
                    let pause = wait
                        .filter(|w| *w > self.delay * 2)
                        .unwrap_or(self.delay * 2);
                    warn!(wait_secs = pause.as_secs(), "rate limited, backing off");
                    tokio::time::sleep(pause).await;
                    last = FetchOutcome::RateLimited { wait };
                },
                FetchOutcome::Retryable(reason) => {
                    warn!(attempt = used, %reason, "retryable failure");
                    last = FetchOutcome::Retryable(reason);
                    if used < self.max_attempts {
                        tokio::time::sleep(self.delay).await;
                    }
                },
            }
        }

        warn!(max_attempts = self.max_attempts, "attempt budget exhausted");
        last
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::transport::TransportClient;
    use std::collections::BTreeMap;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    fn test_client() -> TransportClient {
        let settings = DownloadSettings {
            timeout_secs: 5,
            ..DownloadSettings::default()
        };
        TransportClient::new(&settings).unwrap()
    }

    async fn run_against(server: &MockServer, policy: RetryPolicy) -> FetchOutcome {
        let client = test_client();
        let headers = BTreeMap::new();
        let url = server.uri();
        policy.run(|| client.fetch(&url, &headers, None)).await
    }

    #[tokio::test]
    async fn test_never_exceeds_attempt_budget() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let outcome = run_against(&server, fast_policy(3)).await;
        assert!(matches!(outcome, FetchOutcome::Retryable(_)));
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_recovers_within_budget() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let outcome = run_against(&server, fast_policy(3)).await;
        assert!(outcome.is_success());
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_fatal_short_circuits() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let outcome = run_against(&server, fast_policy(5)).await;
        assert!(matches!(outcome, FetchOutcome::Fatal(_)));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rate_limited_does_not_consume_budget() {
        let server = MockServer::start().await;
        // Two 429s, then success. With a budget of one attempt this can only
        // succeed if rate-limit responses give their slot back.
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let outcome = run_against(&server, fast_policy(1)).await;
        assert!(outcome.is_success());
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_outcome() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let outcome = run_against(&server, fast_policy(2)).await;
        match outcome {
            FetchOutcome::Retryable(reason) => assert!(reason.contains("502")),
            other => panic!("expected Retryable, got {:?}", other),
        }
    }
}
