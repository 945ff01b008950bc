//! Event entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use eventhub_core::error::AppError;
use eventhub_core::result::AppResult;

use super::seats::{SeatError, SeatLedger};
use super::status::EventStatus;

/// An event with a fixed number of seats.
///
/// The seat counters are private: they are initialised from the capacity at
/// creation and afterwards only move through [`Event::reserve_seats`] and
/// [`Event::release_seats`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Event {
    /// Unique event identifier.
    pub id: Uuid,
    /// Event title.
    pub title: String,
    /// Long-form description.
    pub description: String,
    /// When the event takes place.
    pub date: DateTime<Utc>,
    /// Where the event takes place.
    pub venue: String,
    /// Capacity, fixed at creation.
    total_seats: i32,
    /// Seats not yet reserved.
    available_seats: i32,
    /// When the event was created.
    pub created_at: DateTime<Utc>,
    /// When the event was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Data required to create a new event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEvent {
    /// Event title.
    pub title: String,
    /// Long-form description.
    pub description: String,
    /// When the event takes place.
    pub date: DateTime<Utc>,
    /// Where the event takes place.
    pub venue: String,
    /// Capacity.
    pub total_seats: i32,
}

/// Partial update of an event's descriptive fields.
///
/// Capacity is intentionally absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEvent {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New date.
    pub date: Option<DateTime<Utc>>,
    /// New venue.
    pub venue: Option<String>,
}

impl UpdateEvent {
    /// Whether the update touches no field at all.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.date.is_none()
            && self.venue.is_none()
    }
}

impl Event {
    /// Build and validate a new event with every seat available.
    ///
    /// Rejects empty text fields, a non-positive capacity, and a date in
    /// the past relative to `now`.
    pub fn create(data: CreateEvent, now: DateTime<Utc>) -> AppResult<Self> {
        let seats = SeatLedger::new(data.total_seats)?;
        let event = Self {
            id: Uuid::new_v4(),
            title: data.title.trim().to_string(),
            description: data.description.trim().to_string(),
            date: data.date,
            venue: data.venue.trim().to_string(),
            total_seats: seats.total(),
            available_seats: seats.available(),
            created_at: now,
            updated_at: now,
        };
        event.validate_fields()?;
        if event.date < now {
            return Err(AppError::validation("Event date cannot be in the past"));
        }
        Ok(event)
    }

    /// Capacity.
    pub fn total_seats(&self) -> i32 {
        self.total_seats
    }

    /// Seats not yet reserved.
    pub fn available_seats(&self) -> i32 {
        self.available_seats
    }

    /// Current seat ledger.
    pub fn seats(&self) -> SeatLedger {
        SeatLedger::unchecked(self.total_seats, self.available_seats)
    }

    /// Reserve `requested` seats on this loaded event.
    ///
    /// Only meaningful while the caller holds the event's row lock.
    pub fn reserve_seats(&mut self, requested: i32) -> Result<(), SeatError> {
        let next = self.seats().reserve(requested)?;
        self.apply(next);
        Ok(())
    }

    /// Release `requested` seats on this loaded event.
    pub fn release_seats(&mut self, requested: i32) -> Result<(), SeatError> {
        let next = self.seats().release(requested)?;
        self.apply(next);
        Ok(())
    }

    fn apply(&mut self, seats: SeatLedger) {
        self.available_seats = seats.available();
    }

    /// Check the seat invariant of the current counters.
    pub fn validate(&self) -> Result<(), SeatError> {
        self.seats().validate()
    }

    /// Derived status at instant `now`.
    pub fn status_at(&self, now: DateTime<Utc>) -> EventStatus {
        EventStatus::derive(self.date, self.seats(), now)
    }

    /// Derived status right now.
    pub fn status(&self) -> EventStatus {
        self.status_at(Utc::now())
    }

    /// Whether the event date has elapsed.
    pub fn is_past(&self, now: DateTime<Utc>) -> bool {
        self.date < now
    }

    /// Apply a partial update to the descriptive fields.
    ///
    /// The date of an event that already took place cannot change, and a
    /// new date cannot be in the past.
    pub fn apply_update(&mut self, update: UpdateEvent, now: DateTime<Utc>) -> AppResult<()> {
        if let Some(date) = update.date {
            if date != self.date {
                if self.is_past(now) {
                    return Err(AppError::validation(
                        "Cannot reschedule an event that already took place",
                    ));
                }
                if date < now {
                    return Err(AppError::validation("Event date cannot be in the past"));
                }
                self.date = date;
            }
        }
        if let Some(title) = update.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = update.description {
            self.description = description.trim().to_string();
        }
        if let Some(venue) = update.venue {
            self.venue = venue.trim().to_string();
        }
        self.validate_fields()?;
        self.validate()?;
        self.updated_at = now;
        Ok(())
    }

    fn validate_fields(&self) -> AppResult<()> {
        if self.title.is_empty() {
            return Err(AppError::validation("Title is required"));
        }
        if self.description.is_empty() {
            return Err(AppError::validation("Description is required"));
        }
        if self.venue.is_empty() {
            return Err(AppError::validation("Venue is required"));
        }
        Ok(())
    }
}
