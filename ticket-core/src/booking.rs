use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ticket_shared::Masked;
use uuid::Uuid;

use crate::{present, CoreError, CoreResult};

/// Booking lifecycle. `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(CoreError::InvalidStatus(other.to_string())),
        }
    }
}

/// A single requester's reservation against one event.
///
/// The event is referenced by id only; a booking never owns it.
/// Serialize-only: bookings are built through the validating constructors or `restore`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Booking {
    id: Uuid,
    event_id: Uuid,
    requester: Masked<String>,
    status: BookingStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        id: Option<Uuid>,
        event_id: Option<Uuid>,
        requester: impl Into<String>,
        status: BookingStatus,
    ) -> CoreResult<Self> {
        let id = present(id).ok_or(CoreError::InvalidIdentity)?;
        let event_id = present(event_id).ok_or(CoreError::InvalidEventReference)?;
        let requester = requester.into();
        if requester.is_empty() {
            return Err(CoreError::EmptyRequester);
        }

        let now = Utc::now();
        Ok(Self {
            id,
            event_id,
            requester: Masked::new(requester),
            status,
            created_at: now,
            updated_at: now,
        })
    }

    /// Same as [`Booking::new`] but takes the status as it arrives on the wire.
    pub fn with_status_str(
        id: Option<Uuid>,
        event_id: Option<Uuid>,
        requester: impl Into<String>,
        status: &str,
    ) -> CoreResult<Self> {
        // Field checks run first, status last.
        let mut booking = Self::new(id, event_id, requester, BookingStatus::Pending)?;
        booking.status = status.parse()?;
        Ok(booking)
    }

    /// A fresh pending booking with a generated id, as the reservation flow creates it.
    pub fn pending(event_id: Uuid, requester: impl Into<String>) -> CoreResult<Self> {
        Self::new(Some(Uuid::new_v4()), Some(event_id), requester, BookingStatus::Pending)
    }

    /// Rebuild a booking loaded from storage.
    pub fn restore(
        id: Uuid,
        event_id: Uuid,
        requester: String,
        status: BookingStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            event_id,
            requester: Masked::new(requester),
            status,
            created_at,
            updated_at,
        }
    }

    /// pending -> confirmed. Confirming twice is fine; confirming a cancelled booking is not.
    pub fn confirm(&mut self) -> CoreResult<()> {
        if self.status == BookingStatus::Cancelled {
            return Err(CoreError::IllegalTransition {
                from: self.status,
                to: BookingStatus::Confirmed,
            });
        }
        self.status = BookingStatus::Confirmed;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// pending -> cancelled. A confirmed booking cannot be revoked.
    pub fn cancel(&mut self) -> CoreResult<()> {
        if self.status == BookingStatus::Confirmed {
            return Err(CoreError::IllegalTransition {
                from: self.status,
                to: BookingStatus::Cancelled,
            });
        }
        self.status = BookingStatus::Cancelled;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn requester(&self) -> &Masked<String> {
        &self.requester
    }

    pub fn status(&self) -> BookingStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> Booking {
        Booking::pending(Uuid::new_v4(), "fan@example.com").unwrap()
    }

    #[test]
    fn test_serialized_booking_exposes_requester_but_debug_does_not() {
        let booking = pending();
        let json = serde_json::to_value(&booking).unwrap();
        assert_eq!(json["requester"], "fan@example.com");
        assert_eq!(json["status"], "pending");
        assert!(!format!("{:?}", booking).contains("fan@example.com"));
    }

    #[test]
    fn test_new_booking_round_trip() {
        let id = Uuid::new_v4();
        let event_id = Uuid::new_v4();
        let booking = Booking::new(Some(id), Some(event_id), "fan@example.com", BookingStatus::Pending).unwrap();

        assert_eq!(booking.id(), id);
        assert_eq!(booking.event_id(), event_id);
        assert_eq!(booking.requester().expose(), "fan@example.com");
        assert_eq!(booking.status(), BookingStatus::Pending);
        assert_eq!(booking.created_at(), booking.updated_at());
    }

    #[test]
    fn test_new_booking_validation_errors() {
        let event_id = Some(Uuid::new_v4());

        let no_id = Booking::new(None, event_id, "a@b.c", BookingStatus::Pending);
        assert!(matches!(no_id, Err(CoreError::InvalidIdentity)));

        let nil_event = Booking::new(Some(Uuid::new_v4()), Some(Uuid::nil()), "a@b.c", BookingStatus::Pending);
        assert!(matches!(nil_event, Err(CoreError::InvalidEventReference)));

        let no_event = Booking::new(Some(Uuid::new_v4()), None, "a@b.c", BookingStatus::Pending);
        assert!(matches!(no_event, Err(CoreError::InvalidEventReference)));

        let empty = Booking::new(Some(Uuid::new_v4()), event_id, "", BookingStatus::Pending);
        assert!(matches!(empty, Err(CoreError::EmptyRequester)));

        let bad_status = Booking::with_status_str(Some(Uuid::new_v4()), event_id, "a@b.c", "archived");
        assert!(matches!(bad_status, Err(CoreError::InvalidStatus(s)) if s == "archived"));
    }

    #[test]
    fn test_with_status_str_checks_fields_before_status() {
        assert!(matches!(
            Booking::with_status_str(None, Some(Uuid::new_v4()), "a@b.c", "bogus"),
            Err(CoreError::InvalidIdentity)
        ));
        assert!(matches!(
            Booking::with_status_str(Some(Uuid::new_v4()), None, "a@b.c", "bogus"),
            Err(CoreError::InvalidEventReference)
        ));
        assert!(matches!(
            Booking::with_status_str(Some(Uuid::new_v4()), Some(Uuid::new_v4()), "", "bogus"),
            Err(CoreError::EmptyRequester)
        ));
        assert!(matches!(
            Booking::with_status_str(Some(Uuid::new_v4()), Some(Uuid::new_v4()), "a@b.c", "bogus"),
            Err(CoreError::InvalidStatus(s)) if s == "bogus"
        ));
    }

    #[test]
    fn test_with_status_str_accepts_known_values() {
        for raw in ["pending", "confirmed", "cancelled"] {
            let booking = Booking::with_status_str(Some(Uuid::new_v4()), Some(Uuid::new_v4()), "a@b.c", raw).unwrap();
            assert_eq!(booking.status().as_str(), raw);
        }
    }

    #[test]
    fn test_confirm_and_cancel_from_pending() {
        let mut confirmed = pending();
        confirmed.confirm().unwrap();
        assert_eq!(confirmed.status(), BookingStatus::Confirmed);

        let mut cancelled = pending();
        cancelled.cancel().unwrap();
        assert_eq!(cancelled.status(), BookingStatus::Cancelled);
    }

    #[test]
    fn test_terminal_states_reject_crossing() {
        let mut confirmed = pending();
        confirmed.confirm().unwrap();
        let err = confirmed.cancel().unwrap_err();
        assert!(matches!(
            err,
            CoreError::IllegalTransition { from: BookingStatus::Confirmed, to: BookingStatus::Cancelled }
        ));
        assert_eq!(confirmed.status(), BookingStatus::Confirmed);

        let mut cancelled = pending();
        cancelled.cancel().unwrap();
        let err = cancelled.confirm().unwrap_err();
        assert!(matches!(
            err,
            CoreError::IllegalTransition { from: BookingStatus::Cancelled, to: BookingStatus::Confirmed }
        ));
        assert_eq!(cancelled.status(), BookingStatus::Cancelled);
    }

    #[test]
    fn test_repeating_a_transition_is_allowed() {
        let mut booking = pending();
        booking.confirm().unwrap();
        booking.confirm().unwrap();
        assert_eq!(booking.status(), BookingStatus::Confirmed);

        let mut booking = pending();
        booking.cancel().unwrap();
        booking.cancel().unwrap();
        assert_eq!(booking.status(), BookingStatus::Cancelled);
    }

    #[test]
    fn test_debug_masks_requester() {
        let booking = pending();
        let debug = format!("{:?}", booking);
        assert!(!debug.contains("fan@example.com"));

        let json = serde_json::to_value(&booking).unwrap();
        assert_eq!(json["requester"], "fan@example.com");
        assert_eq!(json["status"], "pending");
    }
}
