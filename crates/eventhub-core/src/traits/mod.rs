//! Core traits defined in `eventhub-core` and implemented by other crates.

pub mod cache;

pub use cache::CacheProvider;
