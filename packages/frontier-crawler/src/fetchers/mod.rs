//! Fetcher implementations.
//!
//! - `RateLimitedFetcher` - Wrapper that paces requests with a local quota
//! - `TwitterFetcher` - Timelines from the Twitter v1.1 API (`twitter` feature)

pub mod rate_limited;

#[cfg(feature = "twitter")]
pub mod twitter;

pub use rate_limited::{PostFetcherExt, RateLimitedFetcher};

#[cfg(feature = "twitter")]
pub use twitter::TwitterFetcher;
