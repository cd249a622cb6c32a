use std::time::Duration;

use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::{error, info, warn};

use crate::error::SubmissionError;
use crate::models::entry::{EntryId, EntryRecord};

pub const DEFAULT_BASE_URL: &str = "https://my.clockodo.com/api/v2";

/// Clockodo API credentials, supplied out-of-band via the environment.
pub struct ApiCredentials {
    pub user: String,
    pub key: String,
}

/// Pacing and retry knobs for the submission client.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt before a failure becomes fatal.
    pub max_retries: u32,
    /// Minimum gap between consecutive API calls.
    pub min_call_gap: Duration,
    /// Base delay for exponential backoff when the server gives no hint.
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_call_gap: Duration::from_secs(1),
            backoff_base: Duration::from_secs(1),
        }
    }
}

/// Authenticated client for the Clockodo entries endpoint.
///
/// Calls are paced to at most one per `min_call_gap`; rate-limit and
/// transient failures are retried with backoff up to the policy bound,
/// while any other client error fails immediately.
pub struct SubmissionClient {
    http: Client,
    base_url: String,
    policy: RetryPolicy,
    last_call: Mutex<Option<Instant>>,
}

impl SubmissionClient {
    pub fn new(
        credentials: &ApiCredentials,
        external_app: &str,
    ) -> Result<Self, SubmissionError> {
        info!("Initializing Clockodo client for user {}", credentials.user);

        let mut api_key = header::HeaderValue::from_str(&credentials.key)?;
        api_key.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert("X-ClockodoApiUser", header::HeaderValue::from_str(&credentials.user)?);
        headers.insert("X-ClockodoApiKey", api_key);
        headers.insert(
            "X-Clockodo-External-Application",
            header::HeaderValue::from_str(external_app)?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            policy: RetryPolicy::default(),
            last_call: Mutex::new(None),
        })
    }

    /// Point the client at a different API root. Used by tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Create one time entry, returning the identifier the API assigned.
    pub async fn submit(&self, entry: &EntryRecord) -> Result<EntryId, SubmissionError> {
        let url = format!("{}/entries", self.base_url);
        let mut attempt: u32 = 0;

        loop {
            self.throttle().await;

            match self.http.post(&url).json(entry).send().await {
                Ok(response) if response.status().is_success() => {
                    let created: CreateEntryResponse =
                        response.json().await.map_err(SubmissionError::Transport)?;
                    let id = EntryId(created.entry.id);
                    info!("Created entry {}: {}", id, entry);
                    return Ok(id);
                }
                Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                    if attempt >= self.policy.max_retries {
                        error!("Rate limited on every attempt, giving up");
                        return Err(SubmissionError::RetriesExhausted {
                            attempts: attempt + 1,
                        });
                    }

                    let delay = retry_after(&response).unwrap_or_else(|| self.backoff(attempt));
                    warn!(
                        "Rate limited by the Clockodo API, retrying in {:?} (attempt {})",
                        delay,
                        attempt + 1
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Ok(response) if response.status().is_client_error() => {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "unknown error".to_string());
                    error!("Clockodo API rejected the entry with {}: {}", status, body);
                    return Err(SubmissionError::Rejected { status, body });
                }
                Ok(response) => {
                    // Server-side errors are treated as transient.
                    let status = response.status();
                    if attempt >= self.policy.max_retries {
                        error!("Server kept failing with {}, giving up", status);
                        return Err(SubmissionError::RetriesExhausted {
                            attempts: attempt + 1,
                        });
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        "Clockodo API returned {}, retrying in {:?} (attempt {})",
                        status,
                        delay,
                        attempt + 1
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if attempt >= self.policy.max_retries {
                        error!("Network failure talking to the Clockodo API: {}", e);
                        return Err(SubmissionError::Transport(e));
                    }

                    let delay = self.backoff(attempt);
                    warn!("Request failed ({}), retrying in {:?}", e, delay);
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// One authenticated round-trip to confirm the credentials work.
    pub async fn verify_credentials(&self) -> Result<(), SubmissionError> {
        let url = format!("{}/user", self.base_url);
        self.throttle().await;

        let response = self.http.get(&url).send().await?;
        if response.status().is_success() {
            info!("API connection successful");
            return Ok(());
        }

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        error!("API connection failed with {}: {}", status, body);
        Err(SubmissionError::Rejected { status, body })
    }

    /// Suspend until the minimum inter-call gap has passed.
    async fn throttle(&self) {
        let mut last_call = self.last_call.lock().await;

        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.policy.min_call_gap {
                sleep(self.policy.min_call_gap - elapsed).await;
            }
        }

        *last_call = Some(Instant::now());
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.policy.backoff_base * 2u32.saturating_pow(attempt)
    }
}

fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[derive(Deserialize)]
struct CreateEntryResponse {
    entry: CreatedEntry,
}

#[derive(Deserialize)]
struct CreatedEntry {
    id: i64,
}
