//! Role checks for admin-only and owner-or-admin operations.

pub mod enforcer;

pub use enforcer::RbacEnforcer;
