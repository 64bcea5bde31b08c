//! Cached, throttled and retrying access to upstream metadata.
//!
//! [`FetchCache`] is the single shared gateway for release feed and catalog
//! requests. It is created once per process and shared by every caller, so
//! its throttle is the only point of contention in the system.
//!
//! Upstream failures never escape as errors: every outcome other than a 2xx
//! body collapses to `None` after the retry policy has run.
//!
//! # Retry policy
//!
//! | Response             | Action                                              |
//! |----------------------|-----------------------------------------------------|
//! | 2xx                  | cache under the requested class, return the body    |
//! | 401 / 403            | return `None` immediately, hint about credentials   |
//! | 429                  | wait `Retry-After` or `2^attempt` units, retry      |
//! | other / network fail | wait `attempt` units, retry                          |

pub mod cache;
pub mod throttle;
pub mod transport;

pub use cache::{CacheDuration, CacheEntry, ResponseCache};
pub use throttle::Throttle;
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport, is_github_api};

use crate::config::FetchConfig;
use crate::utils::backoff::{linear_delay, rate_limit_delay};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Shared fetch gateway: TTL cache, call throttle and retry loop.
pub struct FetchCache {
    transport: Arc<dyn HttpTransport>,
    cache: ResponseCache,
    throttle: Throttle,
    backoff_unit: Duration,
}

impl FetchCache {
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, config: &FetchConfig) -> Self {
        Self {
            transport,
            cache: ResponseCache::new(
                Duration::from_secs(config.short_ttl_secs),
                Duration::from_secs(config.long_ttl_secs),
            ),
            throttle: Throttle::new(
                config.max_concurrent,
                Duration::from_millis(config.min_interval_ms),
            ),
            backoff_unit: Duration::from_millis(config.backoff_unit_ms),
        }
    }

    /// The transport this cache fetches through, shared with downloaders.
    #[must_use]
    pub fn transport(&self) -> Arc<dyn HttpTransport> {
        Arc::clone(&self.transport)
    }

    #[must_use]
    pub const fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Return the body for `url`, from cache or upstream.
    ///
    /// `max_retries` is the total number of upstream attempts (at least one).
    pub async fn fetch(
        &self,
        url: &str,
        max_retries: u32,
        duration: CacheDuration,
    ) -> Option<String> {
        if let Some(content) = self.cache.get(url) {
            debug!(url, "Cache hit");
            return Some(content);
        }

        let attempts = max_retries.max(1);
        for attempt in 1..=attempts {
            let result = {
                let _slot = self.throttle.acquire().await?;
                self.transport.get(url).await
            };
            let final_attempt = attempt == attempts;

            let delay = match result {
                Ok(response) if response.is_success() => {
                    self.cache.insert(url, response.body.clone(), duration);
                    return Some(response.body);
                }
                Ok(response) if matches!(response.status, 401 | 403) => {
                    self.warn_auth_denied(url, response.status);
                    return None;
                }
                Ok(response) if response.status == 429 => {
                    let retry_after =
                        response.retry_after.as_deref().and_then(|v| v.trim().parse::<u64>().ok());
                    debug!(url, attempt, ?retry_after, "Rate limited");
                    if final_attempt {
                        self.warn_rate_limited(url, attempts);
                        return None;
                    }
                    rate_limit_delay(attempt, self.backoff_unit, retry_after)
                }
                Ok(response) => {
                    debug!(url, attempt, status = response.status, "Unexpected status");
                    linear_delay(attempt, self.backoff_unit)
                }
                Err(e) => {
                    debug!(url, attempt, "Fetch failed: {}", e);
                    linear_delay(attempt, self.backoff_unit)
                }
            };

            if final_attempt {
                warn!(url, attempts, "Giving up after repeated fetch failures");
                return None;
            }
            tokio::time::sleep(delay).await;
        }

        None
    }

    /// Drop the cached body for `url` so the next fetch goes upstream.
    pub fn invalidate(&self, url: &str) {
        if self.cache.invalidate(url) {
            debug!(url, "Invalidated cache entry");
        }
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    fn warn_auth_denied(&self, url: &str, status: u16) {
        if is_github_api(url) && !self.transport.has_credentials(url) {
            warn!(
                url,
                status,
                "Access denied by GitHub API; set GITHUB_TOKEN or github_token in the config to raise the anonymous rate limit"
            );
        } else {
            warn!(url, status, "Access denied by upstream");
        }
    }

    fn warn_rate_limited(&self, url: &str, attempts: u32) {
        if is_github_api(url) && !self.transport.has_credentials(url) {
            warn!(
                url,
                attempts,
                "Rate limit exhausted for anonymous GitHub API access; configure GITHUB_TOKEN"
            );
        } else {
            warn!(url, attempts, "Rate limit exhausted");
        }
    }
}
