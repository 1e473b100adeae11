//! Adaptive rate limiting for the PubMed adapter.
//!
//! A governor instance spaces requests at ≤ 3/s (NCBI's documented polite
//! limit). On 429, the governor is slowed and the caller retries with
//! 2, 4, 6 s backoff; after 30 s with no further 429s the original rate is
//! restored.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Error distinguishing a 429 (with optional `Retry-After`) from any other
/// adapter failure.
#[derive(Debug, Clone)]
pub enum DbQueryError {
    RateLimited { retry_after: Option<Duration> },
    Other(String),
}

impl std::fmt::Display for DbQueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbQueryError::RateLimited {
                retry_after: Some(d),
            } => write!(f, "rate limited (429), retry after {:.1}s", d.as_secs_f64()),
            DbQueryError::RateLimited { retry_after: None } => write!(f, "rate limited (429)"),
            DbQueryError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for DbQueryError {}

impl From<reqwest::Error> for DbQueryError {
    fn from(e: reqwest::Error) -> Self {
        DbQueryError::Other(e.to_string())
    }
}

impl From<serde_json::Error> for DbQueryError {
    fn from(e: serde_json::Error) -> Self {
        DbQueryError::Other(e.to_string())
    }
}

/// Per-adapter rate limiter with adaptive slowdown on 429, via ArcSwap so
/// concurrent callers never block on a write lock to read the current rate.
pub struct AdaptiveDbLimiter {
    limiter: ArcSwap<DirectLimiter>,
    base_period: Duration,
    current_factor: AtomicU32,
    last_429: std::sync::Mutex<Option<Instant>>,
}

impl AdaptiveDbLimiter {
    pub fn new(period: Duration) -> Self {
        let quota = Quota::with_period(period).expect("period must be > 0");
        Self {
            limiter: ArcSwap::from(Arc::new(DirectLimiter::direct(quota))),
            base_period: period,
            current_factor: AtomicU32::new(1),
            last_429: std::sync::Mutex::new(None),
        }
    }

    pub fn per_second(n: u32) -> Self {
        Self::new(Duration::from_millis(1000 / n.max(1) as u64))
    }

    /// Block until the governor admits the next request.
    pub async fn acquire(&self) {
        self.try_decay();
        let limiter = self.limiter.load();
        limiter.until_ready().await;
    }

    /// Double the slowdown factor (capped at 16x) after a 429.
    pub fn on_rate_limited(&self) {
        if let Ok(mut last) = self.last_429.lock() {
            *last = Some(Instant::now());
        }
        let _ = self
            .current_factor
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |f| Some((f * 2).min(16)));

        let factor = self.current_factor.load(Ordering::SeqCst);
        if let Some(scaled) = self.base_period.checked_mul(factor)
            && let Some(quota) = Quota::with_period(scaled)
        {
            self.limiter.store(Arc::new(DirectLimiter::direct(quota)));
        }
    }

    fn try_decay(&self) {
        let should_restore = self
            .last_429
            .lock()
            .ok()
            .and_then(|last| last.map(|t| t.elapsed().as_secs() >= 30))
            .unwrap_or(false);

        if should_restore && self.current_factor.load(Ordering::SeqCst) > 1 {
            self.current_factor.store(1, Ordering::SeqCst);
            let quota = Quota::with_period(self.base_period).expect("base period valid");
            self.limiter.store(Arc::new(DirectLimiter::direct(quota)));
        }
    }
}

/// `Err` if `resp` is a 429, carrying any `Retry-After` header found.
pub fn check_rate_limit_response(resp: &reqwest::Response) -> Result<(), DbQueryError> {
    if resp.status().as_u16() == 429 {
        let retry_after = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        Err(DbQueryError::RateLimited { retry_after })
    } else {
        Ok(())
    }
}

/// Parse a `Retry-After` header: integer seconds, or a conservative 5 s
/// fallback for an HTTP-date value (date parsing is overkill for a polite
/// retry hint).
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    if let Ok(secs) = value.trim().parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    if value.contains(',') || value.contains("GMT") {
        return Some(Duration::from_secs(5));
    }
    None
}

/// Run `f` against the PubMed rate limiter, retrying on 429 with 2, 4, 6 s
/// backoff (three attempts total).
pub async fn with_pubmed_backoff<F, Fut, T>(
    limiter: &AdaptiveDbLimiter,
    mut f: F,
) -> Result<T, DbQueryError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, DbQueryError>>,
{
    const BACKOFFS: [u64; 3] = [2, 4, 6];
    let mut last_err = None;
    for backoff in BACKOFFS {
        limiter.acquire().await;
        match f().await {
            Ok(v) => return Ok(v),
            Err(DbQueryError::RateLimited { retry_after }) => {
                limiter.on_rate_limited();
                let wait = retry_after.unwrap_or(Duration::from_secs(backoff));
                tokio::time::sleep(wait).await;
                last_err = Some(DbQueryError::RateLimited { retry_after });
            }
            Err(other) => return Err(other),
        }
    }
    Err(last_err.unwrap_or(DbQueryError::Other("exhausted retries".into())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_integer_seconds() {
        assert_eq!(parse_retry_after("5"), Some(Duration::from_secs(5)));
    }

    #[test]
    fn parse_http_date_gmt() {
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn parse_garbage_none() {
        assert_eq!(parse_retry_after("xyz"), None);
    }

    #[test]
    fn starts_at_factor_1() {
        let limiter = AdaptiveDbLimiter::per_second(10);
        assert_eq!(limiter.current_factor.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn on_rate_limited_doubles() {
        let limiter = AdaptiveDbLimiter::per_second(10);
        limiter.on_rate_limited();
        assert_eq!(limiter.current_factor.load(Ordering::SeqCst), 2);
        limiter.on_rate_limited();
        assert_eq!(limiter.current_factor.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn factor_caps_at_16() {
        let limiter = AdaptiveDbLimiter::per_second(10);
        for _ in 0..10 {
            limiter.on_rate_limited();
        }
        assert_eq!(limiter.current_factor.load(Ordering::SeqCst), 16);
    }

    #[tokio::test]
    async fn acquire_completes() {
        let limiter = AdaptiveDbLimiter::per_second(10);
        limiter.acquire().await;
    }

    #[tokio::test(start_paused = true)]
    async fn with_pubmed_backoff_retries_then_succeeds() {
        let limiter = AdaptiveDbLimiter::per_second(10);
        let mut calls = 0;
        let result: Result<u32, DbQueryError> = with_pubmed_backoff(&limiter, || {
            calls += 1;
            let attempt = calls;
            async move {
                if attempt < 2 {
                    Err(DbQueryError::RateLimited {
                        retry_after: Some(Duration::from_millis(1)),
                    })
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 2);
    }
}
