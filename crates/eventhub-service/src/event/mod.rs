//! Event catalogue and its read-through cache.

pub mod cache;
pub mod service;

pub use cache::EventCache;
pub use service::EventService;
