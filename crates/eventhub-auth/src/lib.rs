//! # eventhub-auth
//!
//! Authentication and authorization primitives for EventHub.
//!
//! ## Modules
//!
//! - `jwt`: signed access tokens carrying the user id and role
//! - `password`: Argon2id password hashing and the length policy
//! - `rbac`: admin and ownership checks

pub mod jwt;
pub mod password;
pub mod rbac;

pub use jwt::{Claims, JwtDecoder, JwtEncoder};
pub use password::{PasswordHasher, PasswordValidator};
pub use rbac::RbacEnforcer;
