//! Client-side request budget for any fetcher.
//!
//! The remote API enforces a per-window quota; pacing requests locally keeps
//! a cycle from burning through it in the first few accounts.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::{ConfigError, FetchResult};
use crate::traits::fetcher::PostFetcher;
use crate::types::account::AccountId;
use crate::types::post::Post;

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// A fetcher wrapper that waits for a permit before every request.
pub struct RateLimitedFetcher<F: PostFetcher> {
    inner: F,
    limiter: Arc<DirectRateLimiter>,
}

fn non_zero(value: u32, what: &str) -> Result<NonZeroU32, ConfigError> {
    NonZeroU32::new(value).ok_or_else(|| ConfigError::InvalidQuota(format!("{what} must be > 0")))
}

impl<F: PostFetcher> RateLimitedFetcher<F> {
    pub fn per_minute(fetcher: F, requests_per_minute: u32) -> Result<Self, ConfigError> {
        let quota = Quota::per_minute(non_zero(requests_per_minute, "requests_per_minute")?);
        Ok(Self::with_quota(fetcher, quota))
    }

    pub fn per_second(fetcher: F, requests_per_second: u32) -> Result<Self, ConfigError> {
        let quota = Quota::per_second(non_zero(requests_per_second, "requests_per_second")?);
        Ok(Self::with_quota(fetcher, quota))
    }

    /// Sustained `requests_per_minute` with up to `burst` requests at once.
    pub fn with_burst(fetcher: F, requests_per_minute: u32, burst: u32) -> Result<Self, ConfigError> {
        let quota = Quota::per_minute(non_zero(requests_per_minute, "requests_per_minute")?)
            .allow_burst(non_zero(burst, "burst")?);
        Ok(Self::with_quota(fetcher, quota))
    }

    pub fn with_quota(fetcher: F, quota: Quota) -> Self {
        Self {
            inner: fetcher,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }
}

#[async_trait]
impl<F: PostFetcher> PostFetcher for RateLimitedFetcher<F> {
    async fn fetch_since(&self, account: AccountId, since: Option<u64>) -> FetchResult<Vec<Post>> {
        self.limiter.until_ready().await;
        self.inner.fetch_since(account, since).await
    }
}

/// Extension trait for easy rate limiting.
pub trait PostFetcherExt: PostFetcher + Sized {
    fn rate_limited_per_minute(self, requests_per_minute: u32) -> Result<RateLimitedFetcher<Self>, ConfigError> {
        RateLimitedFetcher::per_minute(self, requests_per_minute)
    }

    fn rate_limited_per_second(self, requests_per_second: u32) -> Result<RateLimitedFetcher<Self>, ConfigError> {
        RateLimitedFetcher::per_second(self, requests_per_second)
    }
}

impl<F: PostFetcher + Sized> PostFetcherExt for F {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;
    use std::time::Instant;

    #[tokio::test]
    async fn test_rate_limiting() {
        let fetcher = MockFetcher::new().rate_limited_per_second(2).unwrap();

        let start = Instant::now();
        for id in 1..=3u64 {
            fetcher.fetch_since(AccountId(id), None).await.unwrap();
        }
        let elapsed = start.elapsed();

        assert_eq!(fetcher.inner().calls().len(), 3);
        // First request is immediate, the next two wait for permits.
        assert!(elapsed.as_millis() >= 500, "Rate limiting not working: {:?}", elapsed);
    }

    #[test]
    fn test_zero_quota_is_rejected() {
        assert!(matches!(
            RateLimitedFetcher::per_minute(MockFetcher::new(), 0),
            Err(ConfigError::InvalidQuota(_))
        ));
        assert!(RateLimitedFetcher::with_burst(MockFetcher::new(), 60, 0).is_err());
        assert!(RateLimitedFetcher::with_burst(MockFetcher::new(), 60, 5).is_ok());
    }
}
