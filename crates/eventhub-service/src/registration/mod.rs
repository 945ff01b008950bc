//! Seat reservation and cancellation.

pub mod service;

pub use service::RegistrationService;
