//! # eventhub-service
//!
//! Business logic service layer for EventHub. Each service orchestrates
//! the inventory store, the read-through cache and authentication to
//! implement application-level use cases.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references.

pub mod context;
pub mod event;
pub mod registration;
pub mod user;

pub use context::RequestContext;
pub use event::{EventCache, EventService};
pub use registration::RegistrationService;
pub use user::{AuthSession, UserService};
