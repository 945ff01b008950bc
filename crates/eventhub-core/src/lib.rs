//! # eventhub-core
//!
//! Core crate for EventHub. Contains the unified error system, configuration
//! schemas, the cache provider trait, and pagination/sorting types.
//!
//! This crate has **no** internal dependencies on other EventHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
