//! Request DTOs with validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use eventhub_core::error::AppError;
use eventhub_entity::event::{CreateEvent, UpdateEvent};
use eventhub_entity::user::UserRole;

/// Run `validator` rules and turn failures into a `Validation` error.
pub fn validate_body<T: Validate>(body: &T) -> Result<(), AppError> {
    body.validate()
        .map_err(|e| AppError::validation(format!("Invalid request body: {e}")))
}

/// Sign-up request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterUserRequest {
    /// Full name.
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    /// Email address.
    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,
    /// Password. Length policy is enforced by the service.
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    /// Optional role, `user` when absent.
    pub role: Option<UserRole>,
}

/// Login request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address.
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    /// Password.
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Create event request (admin).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateEventRequest {
    /// Title.
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Description.
    #[validate(length(min = 1))]
    pub description: String,
    /// When the event takes place.
    pub date: DateTime<Utc>,
    /// Venue.
    #[validate(length(min = 1, max = 200))]
    pub venue: String,
    /// Capacity.
    #[validate(range(
        min = 1,
        max = 10000,
        message = "Total seats must be between 1 and 10000"
    ))]
    pub total_seats: i32,
}

impl From<CreateEventRequest> for CreateEvent {
    fn from(req: CreateEventRequest) -> Self {
        Self {
            title: req.title,
            description: req.description,
            date: req.date,
            venue: req.venue,
            total_seats: req.total_seats,
        }
    }
}

/// Update event request (admin). Capacity cannot be changed.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateEventRequest {
    /// New title.
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    /// New description.
    #[validate(length(min = 1))]
    pub description: Option<String>,
    /// New date.
    pub date: Option<DateTime<Utc>>,
    /// New venue.
    #[validate(length(min = 1, max = 200))]
    pub venue: Option<String>,
}

impl From<UpdateEventRequest> for UpdateEvent {
    fn from(req: UpdateEventRequest) -> Self {
        Self {
            title: req.title,
            description: req.description,
            date: req.date,
            venue: req.venue,
        }
    }
}
