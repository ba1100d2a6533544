//! Sink implementations.

pub mod daily;
pub mod memory;

pub use daily::DailyFileSink;
pub use memory::{MemorySink, SinkEntry};
