//! Event domain entities.

pub mod model;
pub mod query;
pub mod seats;
pub mod status;

pub use model::{CreateEvent, Event, UpdateEvent};
pub use query::{EventQuery, EventSortField};
pub use seats::{SeatError, SeatLedger};
pub use status::EventStatus;
