//! Seams between the scheduler and the outside world.
//!
//! The scheduler only talks to the remote API through [`fetcher::PostFetcher`]
//! and only writes posts through [`sink::PostSink`].

pub mod fetcher;
pub mod sink;
