//! Derived event availability status.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::seats::SeatLedger;

/// Availability status computed from an event's date and seat counters.
///
/// Never stored; recomputed on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    /// The event date has elapsed.
    Past,
    /// No seats remain.
    SoldOut,
    /// Fewer than 20% of seats remain.
    AlmostSoldOut,
    /// Plenty of seats remain.
    Available,
}

impl EventStatus {
    /// Derive the status at instant `now`.
    ///
    /// Checks are ordered: past, then sold out, then almost sold out.
    pub fn derive(date: DateTime<Utc>, seats: SeatLedger, now: DateTime<Utc>) -> Self {
        if date < now {
            Self::Past
        } else if seats.available() <= 0 {
            Self::SoldOut
        } else if i64::from(seats.available()) * 5 < i64::from(seats.total()) {
            Self::AlmostSoldOut
        } else {
            Self::Available
        }
    }

    /// Return the status as an uppercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Past => "PAST",
            Self::SoldOut => "SOLD_OUT",
            Self::AlmostSoldOut => "ALMOST_SOLD_OUT",
            Self::Available => "AVAILABLE",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ledger(total: i32, available: i32) -> SeatLedger {
        SeatLedger::from_parts(total, available).unwrap()
    }

    #[test]
    fn test_past_wins_over_seats() {
        let now = Utc::now();
        let status = EventStatus::derive(now - Duration::hours(1), ledger(10, 0), now);
        assert_eq!(status, EventStatus::Past);
    }

    #[test]
    fn test_sold_out() {
        let now = Utc::now();
        let status = EventStatus::derive(now + Duration::days(1), ledger(10, 0), now);
        assert_eq!(status, EventStatus::SoldOut);
    }

    #[test]
    fn test_almost_sold_out_threshold() {
        let now = Utc::now();
        let future = now + Duration::days(1);
        // 20% of 10 is 2: exactly 2 left is not "almost", 1 left is.
        assert_eq!(
            EventStatus::derive(future, ledger(10, 2), now),
            EventStatus::Available
        );
        assert_eq!(
            EventStatus::derive(future, ledger(10, 1), now),
            EventStatus::AlmostSoldOut
        );
    }

    #[test]
    fn test_serializes_uppercase() {
        let json = serde_json::to_string(&EventStatus::AlmostSoldOut).unwrap();
        assert_eq!(json, "\"ALMOST_SOLD_OUT\"");
    }
}
