//! # eventhub-database
//!
//! Storage for EventHub. PostgreSQL repositories issue the SQL; the
//! [`store`] module wraps them behind transactional traits with a
//! PostgreSQL and an in-process implementation.

pub mod connection;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use store::{InventoryStore, InventoryTx, StoreManager, UserStore};
