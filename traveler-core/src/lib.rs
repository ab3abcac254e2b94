pub mod models;
pub mod search;
pub mod policy;
pub mod report;
pub mod booking;
pub mod repository;
pub mod notify;

pub use models::{Booking, BookingId, Flight, FlightId, FlightPatch, NewFlight, Page};
pub use policy::{BookingScope, Caller, Capability, Role};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Authentication credentials were not provided.")]
    Unauthorized,
    #[error("You do not have permission to perform this action.")]
    Forbidden,
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Job queue error: {0}")]
    Queue(String),
    #[error("Notification error: {0}")]
    Notification(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
