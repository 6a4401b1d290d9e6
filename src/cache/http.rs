//! TTL-bounded HTTP GET cache with request coalescing

use anyhow::{Context, Result, anyhow};
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::clock::Clock;
use super::lock;
use super::stats::{CacheKind, CacheStats};

/// Status and body returned by an [`HttpFetcher`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResponse {
    pub status: u16,
    pub body: String,
}

/// Performs the actual network request behind the cache
pub trait HttpFetcher: Send + Sync {
    /// Any HTTP status is `Ok`; only transport failures are `Err`
    fn get(&self, url: &str, timeout: Duration) -> Result<FetchedResponse>;
}

/// Blocking reqwest client
pub struct ReqwestFetcher {
    client: reqwest::blocking::Client,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(format!("blogcheck/{}", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

impl HttpFetcher for ReqwestFetcher {
    fn get(&self, url: &str, timeout: Duration) -> Result<FetchedResponse> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .with_context(|| format!("GET {url} failed"))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .with_context(|| format!("Failed to read response body from {url}"))?;
        Ok(FetchedResponse { status, body })
    }
}

/// A cached response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
    pub fetched_at: Instant,
}

impl HttpResponse {
    /// Statuses below 400 count as a reachable link
    pub fn is_ok_link(&self) -> bool {
        self.status < 400
    }

    /// Server errors and rate limiting are transient and never stored
    fn is_cacheable(&self) -> bool {
        self.status < 500 && self.status != 429
    }
}

type FlightResult = std::result::Result<Arc<HttpResponse>, String>;

/// One in-progress fetch that other callers can wait on
#[derive(Default)]
struct Flight {
    result: Mutex<Option<FlightResult>>,
    ready: Condvar,
}

impl Flight {
    fn complete(&self, result: FlightResult) {
        *lock(&self.result) = Some(result);
        self.ready.notify_all();
    }

    fn wait(&self) -> Result<Arc<HttpResponse>> {
        let mut guard = lock(&self.result);
        loop {
            if let Some(result) = guard.as_ref() {
                return result.clone().map_err(|message| anyhow!(message));
            }
            guard = self.ready.wait(guard).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

enum Slot {
    Ready(Arc<HttpResponse>),
    Pending(Arc<Flight>),
}

enum Lookup {
    Fresh(Arc<HttpResponse>),
    InFlight(Arc<Flight>),
    Fetch(Arc<Flight>),
}

/// HTTP GET responses keyed by normalized URL.
///
/// Entries expire `ttl` after they were fetched. Concurrent lookups of the
/// same URL share one request. Transport failures, 5xx and 429 responses
/// reach every waiting caller and are never stored.
pub struct HttpCache {
    slots: Mutex<HashMap<String, Slot>>,
    fetcher: Arc<dyn HttpFetcher>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    timeout: Duration,
    stats: Arc<CacheStats>,
}

impl HttpCache {
    pub fn new(
        fetcher: Arc<dyn HttpFetcher>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        timeout: Duration,
        stats: Arc<CacheStats>,
    ) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            fetcher,
            clock,
            ttl,
            timeout,
            stats,
        }
    }

    pub fn get(&self, url: &str) -> Result<Arc<HttpResponse>> {
        let key = normalize_url(url);

        let lookup = {
            let mut slots = lock(&self.slots);
            let now = self.clock.now();
            let existing = match slots.get(&key) {
                Some(Slot::Ready(response))
                    if now.saturating_duration_since(response.fetched_at) < self.ttl =>
                {
                    Some(Lookup::Fresh(response.clone()))
                }
                Some(Slot::Pending(flight)) => Some(Lookup::InFlight(flight.clone())),
                _ => None,
            };
            existing.unwrap_or_else(|| {
                let flight = Arc::new(Flight::default());
                slots.insert(key.clone(), Slot::Pending(flight.clone()));
                Lookup::Fetch(flight)
            })
        };

        match lookup {
            Lookup::Fresh(response) => {
                self.stats.record_hit(CacheKind::Http);
                tracing::trace!("HTTP cache hit: {}", key);
                Ok(response)
            }
            Lookup::InFlight(flight) => {
                self.stats.record_hit(CacheKind::Http);
                tracing::debug!("Waiting on in-flight request: {}", key);
                flight.wait()
            }
            Lookup::Fetch(flight) => {
                self.stats.record_miss(CacheKind::Http);
                tracing::debug!("HTTP cache miss: {}", key);
                self.fetch(key, flight)
            }
        }
    }

    fn fetch(&self, key: String, flight: Arc<Flight>) -> Result<Arc<HttpResponse>> {
        let mut guard = FlightGuard {
            cache: self,
            key: &key,
            flight: &flight,
            armed: true,
        };

        let outcome = self.fetcher.get(&key, self.timeout).map(|fetched| {
            Arc::new(HttpResponse {
                url: key.clone(),
                status: fetched.status,
                body: fetched.body,
                fetched_at: self.clock.now(),
            })
        });

        {
            let mut slots = lock(&self.slots);
            match &outcome {
                Ok(response) if response.is_cacheable() => {
                    slots.insert(key.clone(), Slot::Ready(response.clone()));
                }
                _ => {
                    slots.remove(&key);
                }
            }
        }
        guard.armed = false;
        flight.complete(outcome.as_ref().map(Arc::clone).map_err(|e| format!("{e:#}")));

        outcome
    }

    pub fn len(&self) -> usize {
        lock(&self.slots)
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every completed entry; in-flight requests finish normally
    pub fn clear(&self) {
        lock(&self.slots).retain(|_, slot| matches!(slot, Slot::Pending(_)));
    }
}

/// Releases waiters if the fetcher panics mid-request
struct FlightGuard<'a> {
    cache: &'a HttpCache,
    key: &'a str,
    flight: &'a Flight,
    armed: bool,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            lock(&self.cache.slots).remove(self.key);
            self.flight
                .complete(Err(format!("Request for {} was aborted", self.key)));
        }
    }
}

/// Normalize a URL for use as a cache key: trim whitespace, drop the
/// fragment and lower-case the scheme and host
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    let url = url.split_once('#').map_or(url, |(before, _)| before);

    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let authority_end = rest.find(['/', '?']).unwrap_or(rest.len());
    let (authority, path) = rest.split_at(authority_end);

    format!(
        "{}://{}{}",
        scheme.to_ascii_lowercase(),
        authority.to_ascii_lowercase(),
        path
    )
}
