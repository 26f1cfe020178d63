//! Rate-limited, caching MediaWiki API client.

use std::path::Path;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::Result;
use crate::models::{ApiConfig, CrawlerConfig, RunProgress};

use super::cache::{PageCache, cache_key};

/// State behind the request lock: the cache and the pacing clock.
///
/// Holding one lock across the whole physical request is what serializes
/// callers into submission order: tokio mutexes queue waiters fairly, so
/// the effective request rate is bounded globally, not per caller.
struct FetchState {
    cache: PageCache,
    last_request: Option<Instant>,
}

/// HTTP client for a MediaWiki-style API.
pub struct WikiClient {
    http: Client,
    endpoint: String,
    config: CrawlerConfig,
    state: Mutex<FetchState>,
}

impl WikiClient {
    /// Build a client and eagerly load its disk cache.
    pub async fn new(api: &ApiConfig, crawler: &CrawlerConfig, cache_dir: &Path) -> Result<Self> {
        let http = Client::builder()
            .user_agent(&api.user_agent)
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()?;
        let cache = PageCache::load_with_flush_every(
            PageCache::file_for(cache_dir, &api.endpoint),
            crawler.cache_flush_every,
        )
        .await;

        Ok(Self {
            http,
            endpoint: api.endpoint.clone(),
            config: crawler.clone(),
            state: Mutex::new(FetchState {
                cache,
                last_request: None,
            }),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Perform one API GET.
    ///
    /// Cache hits return immediately, without touching the rate limit.
    /// Misses are serialized behind all prior in-flight calls, paced to at
    /// least `min_interval_ms` between physical requests, and retried: 429
    /// honors `Retry-After`, 5xx and timeouts back off linearly. Never
    /// returns an error; exhausted retries produce a sentinel error
    /// payload so callers can treat a failed fetch like a missing page.
    pub async fn api_get(&self, params: &[(&str, &str)], progress: &RunProgress) -> Value {
        let key = cache_key(params);
        let mut state = self.state.lock().await;

        if let Some(value) = state.cache.get(&key) {
            progress.add_cache_hit();
            return value.clone();
        }

        let mut query: Vec<(&str, &str)> = params.to_vec();
        query.push(("format", "json"));
        query.push(("formatversion", "2"));

        let mut skip_pacing = false;
        for attempt in 1..=self.config.max_retries {
            if !skip_pacing {
                if let Some(last) = state.last_request {
                    let min = Duration::from_millis(self.config.min_interval_ms);
                    let elapsed = last.elapsed();
                    if elapsed < min {
                        tokio::time::sleep(min - elapsed).await;
                    }
                }
            }
            skip_pacing = false;

            let sent = self.http.get(&self.endpoint).query(&query).send().await;
            state.last_request = Some(Instant::now());

            match sent {
                Ok(resp) if resp.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let wait = retry_after_secs(resp.headers())
                        .unwrap_or(self.config.retry_after_default_secs);
                    log::warn!("API throttled (429), waiting {}s", wait);
                    tokio::time::sleep(Duration::from_secs(wait)).await;
                    // the Retry-After sleep already satisfied pacing
                    skip_pacing = true;
                }
                Ok(resp) if resp.status().is_server_error() => {
                    log::warn!(
                        "API returned {}, attempt {}/{}",
                        resp.status(),
                        attempt,
                        self.config.max_retries
                    );
                    self.backoff(attempt).await;
                }
                Ok(resp) => match resp.json::<Value>().await {
                    Ok(value) => {
                        progress.add_api_request();
                        state.cache.insert(key, value.clone());
                        if state.cache.wants_flush() {
                            if let Err(e) = state.cache.save().await {
                                log::warn!("Cache flush failed: {}", e);
                            }
                        }
                        return value;
                    }
                    Err(e) => {
                        log::warn!(
                            "API response decode failed ({}), attempt {}/{}",
                            e,
                            attempt,
                            self.config.max_retries
                        );
                        self.backoff(attempt).await;
                    }
                },
                Err(e) => {
                    log::warn!(
                        "API request failed ({}), attempt {}/{}",
                        e,
                        attempt,
                        self.config.max_retries
                    );
                    self.backoff(attempt).await;
                }
            }
        }

        log::error!("API request exhausted {} attempts", self.config.max_retries);
        sentinel_error("fetch-failed", "request failed after retries")
    }

    /// Flush the page cache to disk.
    pub async fn save_cache(&self) -> Result<()> {
        self.state.lock().await.cache.save().await
    }

    async fn backoff(&self, attempt: u32) {
        let delay = Duration::from_millis(self.config.retry_backoff_ms * attempt as u64);
        tokio::time::sleep(delay).await;
    }
}

/// Whether a payload is an API-level or sentinel error response.
pub fn is_error(value: &Value) -> bool {
    value.get("error").is_some()
}

/// Error payload shaped like the API's own error responses.
fn sentinel_error(code: &str, info: &str) -> Value {
    json!({ "error": { "code": code, "info": info } })
}

fn retry_after_secs(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
