use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{present, CoreError, CoreResult};

/// A bookable offering with finite capacity.
///
/// `available_spots` is read-only here: the only thing allowed to change it is
/// the inventory store's conditional decrement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    id: Uuid,
    name: String,
    price: i64,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    capacity: i32,
    available_spots: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Event {
    /// Validate and build a new event with every spot still available.
    pub fn new(
        id: Option<Uuid>,
        name: impl Into<String>,
        price: i64,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
        capacity: i32,
    ) -> CoreResult<Self> {
        let id = present(id).ok_or(CoreError::InvalidIdentity)?;
        let name = name.into();
        if name.is_empty() {
            return Err(CoreError::EmptyName);
        }
        if price < 0 {
            return Err(CoreError::NegativePrice);
        }
        if start_at > end_at {
            return Err(CoreError::InvalidSchedule);
        }
        if capacity < 0 {
            return Err(CoreError::NegativeCapacity);
        }

        let now = Utc::now();
        Ok(Self {
            id,
            name,
            price,
            start_at,
            end_at,
            capacity,
            available_spots: capacity,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuild an event loaded from storage. No validation: rows were valid when written.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: Uuid,
        name: String,
        price: i64,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
        capacity: i32,
        available_spots: i32,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            price,
            start_at,
            end_at,
            capacity,
            available_spots,
            created_at,
            updated_at,
        }
    }

    pub fn update_name(&mut self, name: impl Into<String>) -> CoreResult<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(CoreError::EmptyName);
        }
        self.name = name;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn reschedule(&mut self, start_at: DateTime<Utc>, end_at: DateTime<Utc>) -> CoreResult<()> {
        if start_at > end_at {
            return Err(CoreError::InvalidSchedule);
        }
        self.start_at = start_at;
        self.end_at = end_at;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> i64 {
        self.price
    }

    pub fn start_at(&self) -> DateTime<Utc> {
        self.start_at
    }

    pub fn end_at(&self) -> DateTime<Utc> {
        self.end_at
    }

    pub fn schedule(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.start_at, self.end_at)
    }

    pub fn capacity(&self) -> i32 {
        self.capacity
    }

    pub fn available_spots(&self) -> i32 {
        self.available_spots
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
    use chrono::Duration;

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc::now() + Duration::hours(1);
        (start, start + Duration::hours(2))
    }

    #[test]
    fn test_new_event_round_trip() {
        let id = Uuid::new_v4();
        let (start, end) = window();
        let event = Event::new(Some(id), "RustConf", 4_500, start, end, 120).unwrap();

        assert_eq!(event.id(), id);
        assert_eq!(event.name(), "RustConf");
        assert_eq!(event.price(), 4_500);
        assert_eq!(event.schedule(), (start, end));
        assert_eq!(event.capacity(), 120);
        assert_eq!(event.available_spots(), 120);
        assert_eq!(event.created_at(), event.updated_at());
    }

    #[test]
    fn test_zero_price_and_capacity_are_allowed() {
        // start == end is a valid (instant) schedule
        let (start, _) = window();
        let event = Event::new(Some(Uuid::new_v4()), "Meetup", 0, start, start, 0).unwrap();
        assert_eq!(event.price(), 0);
        assert_eq!(event.available_spots(), 0);
    }

    #[test]
    fn test_new_event_validation_errors() {
        let (start, end) = window();

        let missing = Event::new(None, "x", 1, start, end, 1);
        assert!(matches!(missing, Err(CoreError::InvalidIdentity)));

        let nil = Event::new(Some(Uuid::nil()), "x", 1, start, end, 1);
        assert!(matches!(nil, Err(CoreError::InvalidIdentity)));

        let empty = Event::new(Some(Uuid::new_v4()), "", 1, start, end, 1);
        assert!(matches!(empty, Err(CoreError::EmptyName)));

        let negative = Event::new(Some(Uuid::new_v4()), "x", -1, start, end, 1);
        assert!(matches!(negative, Err(CoreError::NegativePrice)));

        let inverted = Event::new(Some(Uuid::new_v4()), "x", 1, end, start, 1);
        assert!(matches!(inverted, Err(CoreError::InvalidSchedule)));

        let capacity = Event::new(Some(Uuid::new_v4()), "x", 1, start, end, -5);
        assert!(matches!(capacity, Err(CoreError::NegativeCapacity)));
    }

    #[test]
    fn test_mutators_keep_inventory_untouched() {
        let (start, end) = window();
        let mut event = Event::new(Some(Uuid::new_v4()), "Old", 10, start, end, 3).unwrap();
        let before = event.updated_at();

        event.update_name("New").unwrap();
        event
            .reschedule(start + Duration::days(1), end + Duration::days(1))
            .unwrap();

        assert_eq!(event.name(), "New");
        assert_eq!(event.start_at(), start + Duration::days(1));
        assert_eq!(event.capacity(), 3);
        assert_eq!(event.available_spots(), 3);
        assert!(event.updated_at() >= before);
    }

    #[test]
    fn test_invalid_mutations_leave_event_unchanged() {
        let (start, end) = window();
        let mut event = Event::new(Some(Uuid::new_v4()), "Keep", 10, start, end, 3).unwrap();

        assert!(matches!(event.update_name(""), Err(CoreError::EmptyName)));
        assert!(matches!(event.reschedule(end, start), Err(CoreError::InvalidSchedule)));
        assert_eq!(event.name(), "Keep");
        assert_eq!(event.schedule(), (start, end));
    }
}
