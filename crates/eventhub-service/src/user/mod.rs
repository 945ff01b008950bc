//! Account registration, login and profile.

pub mod service;

pub use service::{AuthSession, UserService};
