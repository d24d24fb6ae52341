pub mod booking;
pub mod event;
pub mod repository;

use std::time::Duration;
use uuid::Uuid;

pub use booking::{Booking, BookingStatus};
pub use event::Event;
pub use repository::Page;

/// Every failure the reservation engine can report.
///
/// Variants are kinds, not messages: transport layers match on them to pick a
/// stable outward signal. Raw storage errors never appear here except inside
/// `TransactionFailure` / `InternalError`, whose text is for logs only.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    // Event validation
    #[error("identity is missing")]
    InvalidIdentity,
    #[error("name is empty")]
    EmptyName,
    #[error("price is negative")]
    NegativePrice,
    #[error("start is after end")]
    InvalidSchedule,
    #[error("capacity is negative")]
    NegativeCapacity,

    // Booking validation and state machine
    #[error("event reference is invalid")]
    InvalidEventReference,
    #[error("requester is empty")]
    EmptyRequester,
    #[error("invalid booking status: {0}")]
    InvalidStatus(String),
    #[error("cannot move booking from {from} to {to}")]
    IllegalTransition { from: BookingStatus, to: BookingStatus },

    // Inventory
    #[error("spot count must be positive, got {0}")]
    InvalidSpotCount(i32),
    #[error("event not found: {0}")]
    EventNotFound(Uuid),
    #[error("event is full: {0}")]
    EventFull(Uuid),

    // Booking lookup
    #[error("booking not found: {0}")]
    BookingNotFound(Uuid),

    // Infrastructure
    #[error("transaction failure: {0}")]
    TransactionFailure(String),
    #[error("transaction exceeded its deadline of {0:?}")]
    Timeout(Duration),
    #[error("internal storage error: {0}")]
    InternalError(String),
}

impl CoreError {
    /// True for the kinds detected before any storage interaction.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidIdentity
                | CoreError::EmptyName
                | CoreError::NegativePrice
                | CoreError::InvalidSchedule
                | CoreError::NegativeCapacity
                | CoreError::InvalidEventReference
                | CoreError::EmptyRequester
                | CoreError::InvalidStatus(_)
                | CoreError::InvalidSpotCount(_)
        )
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Treats both `None` and the nil UUID as an absent identity.
pub(crate) fn present(id: Option<Uuid>) -> Option<Uuid> {
    id.filter(|id| !id.is_nil())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_present_rejects_nil() {
        assert_eq!(present(None), None);
        assert_eq!(present(Some(Uuid::nil())), None);

        let id = Uuid::new_v4();
        assert_eq!(present(Some(id)), Some(id));
    }

    #[test]
    fn test_validation_classification() {
        assert!(CoreError::EmptyName.is_validation());
        assert!(CoreError::InvalidStatus("archived".into()).is_validation());
        assert!(!CoreError::EventFull(Uuid::new_v4()).is_validation());
        assert!(!CoreError::TransactionFailure("boom".into()).is_validation());
    }
}
