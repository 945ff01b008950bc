//! # eventhub-entity
//!
//! Domain entity models for EventHub. Every struct in this crate represents
//! a database table row or a domain value object. Database entities derive
//! `sqlx::FromRow`; enums map onto PostgreSQL enum types via `sqlx::Type`.
//!
//! The seat ledger in [`event::seats`] is the only code allowed to change
//! an event's seat counters.

pub mod event;
pub mod registration;
pub mod user;
