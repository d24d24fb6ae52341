use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crate::{Booking, CoreResult, Event};

/// Offset pagination for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Page {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    10
}

impl Page {
    pub const MAX_LIMIT: i64 = 100;

    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: limit.clamp(1, Self::MAX_LIMIT),
            offset: offset.max(0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

/// Opens, commits and rolls back the unit of work that the reservation steps share.
///
/// The transaction handle is an explicit value threaded through every store call;
/// dropping it without committing must roll it back.
#[async_trait]
pub trait TransactionProvider: Send + Sync {
    type Tx: Send;

    async fn begin(&self) -> CoreResult<Self::Tx>;

    async fn commit(&self, tx: Self::Tx) -> CoreResult<()>;

    async fn rollback(&self, tx: Self::Tx) -> CoreResult<()>;
}

/// Inventory side of a reservation.
#[async_trait]
pub trait InventoryStore<Tx: Send>: Send + Sync {
    /// Atomically take `spots` from the event's remaining inventory.
    ///
    /// Must be a single conditional update (`available_spots >= spots`), never a
    /// read followed by a write. When nothing was updated the store re-checks
    /// existence inside `tx` and reports `EventNotFound` or `EventFull`.
    async fn reserve_spots(&self, tx: &mut Tx, event_id: Uuid, spots: i32) -> CoreResult<()>;
}

/// Booking side of a reservation.
#[async_trait]
pub trait BookingStore<Tx: Send>: Send + Sync {
    async fn insert_booking(&self, tx: &mut Tx, booking: &Booking) -> CoreResult<()>;
}

/// Standalone event persistence.
#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create_event(&self, event: &Event) -> CoreResult<()>;

    async fn get_event(&self, id: Uuid) -> CoreResult<Event>;

    async fn list_events(&self, page: Page) -> CoreResult<Vec<Event>>;

    /// Persists name and schedule. Price, capacity and remaining spots are never written here.
    async fn update_event(&self, event: &Event) -> CoreResult<()>;

    async fn delete_event(&self, id: Uuid) -> CoreResult<()>;
}

/// Standalone booking persistence.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn create_booking(&self, booking: &Booking) -> CoreResult<()>;

    async fn get_booking_by_id(&self, id: Uuid) -> CoreResult<Booking>;

    async fn list_bookings(&self, page: Page) -> CoreResult<Vec<Booking>>;

    async fn update_booking(&self, booking: &Booking) -> CoreResult<()>;

    async fn delete_booking(&self, id: Uuid) -> CoreResult<()>;

    async fn confirm_booking(&self, id: Uuid) -> CoreResult<Booking>;

    async fn cancel_booking(&self, id: Uuid) -> CoreResult<Booking>;
}
