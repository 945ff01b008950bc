//! Seat ledger: the invariant-enforcing arithmetic over an event's seat counters.
//!
//! Every operation is pure. It takes a ledger by value and returns either a
//! new ledger or a [`SeatError`]; nothing here performs I/O or provides
//! atomicity across concurrent loaders. Callers hold the event row lock
//! while applying a ledger result.
//!
//! Invariant: `0 <= available <= total` and `total > 0`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use eventhub_core::error::AppError;

/// Failure modes of seat arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SeatError {
    /// A seat count of zero or less was requested.
    #[error("Seat count must be positive, got {requested}")]
    InvalidArgument {
        /// The rejected request.
        requested: i32,
    },
    /// The event's capacity must be at least one seat.
    #[error("Total seats must be at least 1, got {total}")]
    InvalidCapacity {
        /// The rejected capacity.
        total: i32,
    },
    /// Not enough seats remain to satisfy the request.
    #[error("Requested {requested} seat(s) but only {available} available")]
    CapacityExceeded {
        /// Seats requested.
        requested: i32,
        /// Seats remaining.
        available: i32,
    },
    /// Releasing would push the available count above capacity.
    #[error("Releasing {requested} seat(s) would exceed capacity ({available}/{total})")]
    OverRelease {
        /// Seats being released.
        requested: i32,
        /// Seats currently available.
        available: i32,
        /// Event capacity.
        total: i32,
    },
    /// The counters are outside `0..=total`. Indicates a bug upstream.
    #[error("Seat invariant violated: available={available}, total={total}")]
    InvariantViolation {
        /// Offending available count.
        available: i64,
        /// Event capacity.
        total: i64,
    },
}

impl From<SeatError> for AppError {
    fn from(err: SeatError) -> Self {
        match err {
            SeatError::InvalidArgument { .. } | SeatError::InvalidCapacity { .. } => {
                AppError::validation(err.to_string())
            }
            SeatError::CapacityExceeded { .. } => {
                AppError::conflict(format!("No seats available for this event: {err}"))
            }
            SeatError::OverRelease { .. } | SeatError::InvariantViolation { .. } => {
                AppError::invariant(err.to_string())
            }
        }
    }
}

/// Total and available seat counts of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeatLedger {
    total: i32,
    available: i32,
}

impl SeatLedger {
    /// A fresh ledger with every seat available.
    pub fn new(total: i32) -> Result<Self, SeatError> {
        Self::from_parts(total, total)
    }

    /// Rebuild a ledger from persisted counters, checking the invariant.
    pub fn from_parts(total: i32, available: i32) -> Result<Self, SeatError> {
        let ledger = Self { total, available };
        ledger.validate()?;
        Ok(ledger)
    }

    /// Wrap counters loaded from storage without checking them.
    ///
    /// `reserve`/`release` re-check the invariant on their result, so a
    /// corrupt row surfaces as [`SeatError::InvariantViolation`] on first use.
    pub(crate) fn unchecked(total: i32, available: i32) -> Self {
        Self { total, available }
    }

    /// Event capacity.
    pub fn total(&self) -> i32 {
        self.total
    }

    /// Seats not yet reserved.
    pub fn available(&self) -> i32 {
        self.available
    }

    /// Seats currently reserved.
    pub fn reserved(&self) -> i32 {
        self.total - self.available
    }

    /// Whether `requested` seats could be reserved right now.
    pub fn has_capacity(&self, requested: i32) -> Result<bool, SeatError> {
        if requested <= 0 {
            return Err(SeatError::InvalidArgument { requested });
        }
        Ok(self.available >= requested)
    }

    /// Take `requested` seats.
    pub fn reserve(self, requested: i32) -> Result<Self, SeatError> {
        if !self.has_capacity(requested)? {
            return Err(SeatError::CapacityExceeded {
                requested,
                available: self.available,
            });
        }

        let available = self.available.checked_sub(requested).ok_or(
            SeatError::InvariantViolation {
                available: i64::from(self.available) - i64::from(requested),
                total: i64::from(self.total),
            },
        )?;

        let next = Self {
            total: self.total,
            available,
        };
        next.validate()?;
        Ok(next)
    }

    /// Give back `requested` seats.
    pub fn release(self, requested: i32) -> Result<Self, SeatError> {
        if requested <= 0 {
            return Err(SeatError::InvalidArgument { requested });
        }

        let available = i64::from(self.available) + i64::from(requested);
        if available > i64::from(self.total) {
            return Err(SeatError::OverRelease {
                requested,
                available: self.available,
                total: self.total,
            });
        }

        let next = Self {
            total: self.total,
            available: i32::try_from(available).map_err(|_| SeatError::InvariantViolation {
                available,
                total: i64::from(self.total),
            })?,
        };
        next.validate()?;
        Ok(next)
    }

    /// Check `total > 0` and `0 <= available <= total`.
    pub fn validate(&self) -> Result<(), SeatError> {
        if self.total <= 0 {
            return Err(SeatError::InvalidCapacity { total: self.total });
        }
        if self.available < 0 || self.available > self.total {
            return Err(SeatError::InvariantViolation {
                available: i64::from(self.available),
                total: i64::from(self.total),
            });
        }
        Ok(())
    }
}
