//! Event list filters and the whitelisted sort columns.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use eventhub_core::error::AppError;
use eventhub_core::types::SortDirection;

use super::model::Event;

/// Columns an event list may be sorted by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSortField {
    /// Sort by title.
    Title,
    /// Sort by event date.
    #[default]
    Date,
    /// Sort by remaining seats.
    #[serde(alias = "availableSeats")]
    AvailableSeats,
}

impl EventSortField {
    /// The SQL column backing this sort field.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Date => "date",
            Self::AvailableSeats => "available_seats",
        }
    }
}

impl fmt::Display for EventSortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for EventSortField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(Self::Title),
            "date" => Ok(Self::Date),
            "availableSeats" | "available_seats" => Ok(Self::AvailableSeats),
            _ => Err(AppError::validation(format!(
                "Invalid sort field: '{s}'. Expected one of: title, date, availableSeats"
            ))),
        }
    }
}

/// Filters and ordering for an event list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventQuery {
    /// Case-insensitive title substring.
    pub title: Option<String>,
    /// Only events on or after this instant.
    pub start_date: Option<DateTime<Utc>>,
    /// Only events on or before this instant.
    pub end_date: Option<DateTime<Utc>>,
    /// Only events with at least one seat left.
    #[serde(default)]
    pub available_only: bool,
    /// Sort column.
    #[serde(default)]
    pub sort_by: EventSortField,
    /// Sort direction.
    #[serde(default)]
    pub order: SortDirection,
}

impl EventQuery {
    /// The trimmed title filter, if it is non-empty.
    pub fn title_filter(&self) -> Option<&str> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Whether `event` passes every filter.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(title) = self.title_filter() {
            if !event.title.to_lowercase().contains(&title.to_lowercase()) {
                return false;
            }
        }
        if let Some(start) = self.start_date {
            if event.date < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if event.date > end {
                return false;
            }
        }
        if self.available_only && event.available_seats() <= 0 {
            return false;
        }
        true
    }

    /// Ordering of two events under this query, with id as tiebreaker.
    pub fn compare(&self, a: &Event, b: &Event) -> Ordering {
        let primary = match self.sort_by {
            EventSortField::Title => a.title.cmp(&b.title),
            EventSortField::Date => a.date.cmp(&b.date),
            EventSortField::AvailableSeats => a.available_seats().cmp(&b.available_seats()),
        };
        let primary = match self.order {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }

    /// Reject contradictory date bounds.
    pub fn validate(&self) -> Result<(), AppError> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(AppError::validation(
                    "start_date must not be after end_date",
                ));
            }
        }
        Ok(())
    }
}
