//! Registration entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use eventhub_core::error::AppError;
use eventhub_core::result::AppResult;

use super::status::RegistrationStatus;

/// A user's seat on an event.
///
/// Rows are never deleted. Re-registering after a cancellation creates a
/// new row; at most one confirmed row exists per (user, event).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Registration {
    /// Unique registration identifier.
    pub id: Uuid,
    /// Registered user.
    pub user_id: Uuid,
    /// Event the seat belongs to.
    pub event_id: Uuid,
    /// When the registration was made.
    pub registration_date: DateTime<Utc>,
    /// Current lifecycle state.
    pub status: RegistrationStatus,
}

impl Registration {
    /// A new confirmed registration.
    pub fn confirmed(user_id: Uuid, event_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            event_id,
            registration_date: now,
            status: RegistrationStatus::Confirmed,
        }
    }

    /// Whether this registration currently holds a seat.
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Whether `user_id` owns this registration.
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    /// Move to `Cancelled`. Fails if already cancelled.
    pub fn cancel(&mut self) -> AppResult<()> {
        match self.status {
            RegistrationStatus::Confirmed => {
                self.status = RegistrationStatus::Cancelled;
                Ok(())
            }
            RegistrationStatus::Cancelled => {
                Err(AppError::conflict("Registration is already cancelled"))
            }
        }
    }
}
