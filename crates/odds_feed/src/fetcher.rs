//! Remote fetch seznamu eventů: timeout na pokus, lineární backoff, klasifikace chyb.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::model::MatchId;

/// Endpoint se fixuje při buildu (`ODDSBOARD_EVENTS_URL`), jinak veřejný gist.
pub const DEFAULT_EVENTS_URL: &str = match option_env!("ODDSBOARD_EVENTS_URL") {
    Some(url) => url,
    None => "https://gist.githubusercontent.com/kundan-iguru/94d1b58ca3d16376fda4bd7a0689a662/raw/events.json",
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub url: String,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_EVENTS_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Zdroj syrových eventů pro store. Produkčně `FeedClient`, v testech cokoliv.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch_events(&self) -> Result<Vec<Value>, FetchError>;
}

/// Spouští `attempt` až `max_attempts`krát. Před pokusem n+1 čeká `n × base_delay`.
/// Neopakovatelná chyba (4xx mimo 408, schéma) se vrací hned.
pub async fn retry_with_backoff<T, F, Fut>(
    max_attempts: u32,
    base_delay: Duration,
    mut attempt: F,
) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut n = 1;

    loop {
        match attempt(n).await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) if n >= max_attempts => return Err(e),
            Err(e) => {
                let delay = base_delay * n;
                warn!(
                    "request failed ({}), retrying in {}ms (attempt {}/{})",
                    e,
                    delay.as_millis(),
                    n,
                    max_attempts
                );
                tokio::time::sleep(delay).await;
                n += 1;
            }
        }
    }
}

pub struct FeedClient {
    client: reqwest::Client,
    config: FetcherConfig,
}

impl FeedClient {
    pub fn new(config: FetcherConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("OddsBoardLive/1.0")
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            config,
        }
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Jeden pokus. Timeout zahodí rozběhnutý request (drop = abort).
    async fn attempt(&self, method: Method) -> Result<Option<Value>, FetchError> {
        let request = async {
            let resp = self
                .client
                .request(method.clone(), &self.config.url)
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                return Err(FetchError::from_status(status.as_u16()));
            }
            if method == Method::HEAD {
                return Ok(None);
            }

            let body = resp.bytes().await?;
            let value = serde_json::from_slice::<Value>(&body)
                .map_err(|e| FetchError::Schema(format!("body is not JSON: {e}")))?;
            Ok::<_, FetchError>(Some(value))
        };

        tokio::time::timeout(self.config.timeout, request)
            .await
            .map_err(|_| FetchError::Timeout)?
    }

    async fn request_with_retry(&self, method: Method) -> Result<Option<Value>, FetchError> {
        retry_with_backoff(
            self.config.max_attempts,
            self.config.retry_base_delay,
            |n| {
                debug!("{} {} (attempt {})", method, self.config.url, n);
                self.attempt(method.clone())
            },
        )
        .await
    }

    pub async fn fetch_events(&self) -> Result<Vec<Value>, FetchError> {
        info!("fetching sports events from {}", self.config.url);

        let body = match self.request_with_retry(Method::GET).await {
            Ok(body) => body,
            Err(e) => {
                warn!("failed to fetch sports events: {} ({})", e, e.kind());
                return Err(e);
            }
        };

        match body {
            Some(Value::Array(events)) => {
                info!("fetched {} sports events", events.len());
                Ok(events)
            }
            _ => {
                warn!("invalid API response: expected array of events");
                Err(FetchError::Schema("expected array of events".to_string()))
            }
        }
    }

    pub async fn fetch_event_by_id(&self, id: &MatchId) -> Result<Value, FetchError> {
        let events = self.fetch_events().await?;
        events
            .into_iter()
            .find(|e| e.get("id").and_then(MatchId::from_json).as_ref() == Some(id))
            .ok_or_else(|| FetchError::NotFound(id.to_string()))
    }

    /// HEAD přes stejnou retry logiku. Nikdy nevrací chybu.
    pub async fn check_health(&self) -> bool {
        match self.request_with_retry(Method::HEAD).await {
            Ok(_) => true,
            Err(e) => {
                warn!("API health check failed: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl EventSource for FeedClient {
    async fn fetch_events(&self) -> Result<Vec<Value>, FetchError> {
        FeedClient::fetch_events(self).await
    }
}
