//! Registration domain entities.

pub mod model;
pub mod status;

pub use model::Registration;
pub use status::RegistrationStatus;
