//! RBAC enforcement logic: admin-only operations and resource ownership.

use eventhub_core::error::AppError;
use eventhub_entity::user::UserRole;

/// Enforces role-based access control.
#[derive(Debug, Clone, Copy, Default)]
pub struct RbacEnforcer;

impl RbacEnforcer {
    /// Creates a new enforcer.
    pub fn new() -> Self {
        Self
    }

    /// `Forbidden` unless the role is admin.
    pub fn require_admin(&self, role: UserRole) -> Result<(), AppError> {
        if role.is_admin() {
            Ok(())
        } else {
            Err(AppError::forbidden("Admin access required"))
        }
    }

    /// `Forbidden` unless the actor owns the resource or is an admin.
    pub fn require_owner_or_admin(&self, is_owner: bool, role: UserRole) -> Result<(), AppError> {
        if is_owner || role.is_admin() {
            Ok(())
        } else {
            Err(AppError::forbidden(
                "You do not have permission to access this resource",
            ))
        }
    }
}
