//! Query parameters for the event list endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use eventhub_core::error::AppError;
use eventhub_core::types::SortDirection;
use eventhub_core::types::pagination::{DEFAULT_PAGE_SIZE, PageRequest};
use eventhub_entity::event::{EventQuery, EventSortField};

/// Query parameters for `GET /events`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventListParams {
    /// Page number (1-based, default: 1).
    pub page: Option<u64>,
    /// Items per page (default: 10, max: 100).
    pub limit: Option<u64>,
    /// Case-insensitive title substring.
    pub title: Option<String>,
    /// Earliest event date (RFC 3339).
    pub start_date: Option<DateTime<Utc>>,
    /// Latest event date (RFC 3339).
    pub end_date: Option<DateTime<Utc>>,
    /// Only events with seats left.
    #[serde(default)]
    pub available_only: bool,
    /// `title`, `date` or `availableSeats`.
    pub sort_by: Option<String>,
    /// `ASC` or `DESC`.
    pub order: Option<String>,
}

impl EventListParams {
    /// Converts to a validated filter and a clamped page request.
    pub fn into_parts(self) -> Result<(EventQuery, PageRequest), AppError> {
        if self.page == Some(0) {
            return Err(AppError::validation("Page must be at least 1"));
        }
        if self.limit == Some(0) {
            return Err(AppError::validation("Limit must be at least 1"));
        }

        let sort_by = match self.sort_by.as_deref() {
            Some(s) => s.parse::<EventSortField>()?,
            None => EventSortField::default(),
        };
        let order = match self.order.as_deref() {
            Some(s) => s.parse::<SortDirection>()?,
            None => SortDirection::default(),
        };

        let query = EventQuery {
            title: self.title,
            start_date: self.start_date,
            end_date: self.end_date,
            available_only: self.available_only,
            sort_by,
            order,
        };
        let page = PageRequest::new(
            self.page.unwrap_or(1),
            self.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        );
        Ok((query, page))
    }
}
