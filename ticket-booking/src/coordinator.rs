use async_trait::async_trait;
use std::time::Duration;
use ticket_core::repository::{BookingStore, InventoryStore, TransactionProvider};
use ticket_core::{Booking, BookingStatus, CoreError, CoreResult};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Default upper bound on one reservation transaction.
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(5);

/// The composite operation the transport layer calls into.
#[async_trait]
pub trait BookingService: Send + Sync {
    /// Create a pending booking for `requester` and take one spot from the event.
    async fn reserve(&self, event_id: Uuid, requester: &str) -> CoreResult<Booking>;

    /// Persist an already-built booking together with its spot reservation.
    async fn create_booking(&self, booking: Booking) -> CoreResult<Booking>;
}

/// Sequences the inventory reservation and the booking insert inside one transaction.
///
/// Holds no per-call state, so one instance is shared by every concurrent request.
/// Oversell protection lives entirely in the inventory store's conditional update;
/// this type only guarantees that both writes land together or not at all.
pub struct ReservationCoordinator<T, I, B> {
    transactions: T,
    inventory: I,
    bookings: B,
    timeout: Duration,
}

impl<T, I, B> ReservationCoordinator<T, I, B>
where
    T: TransactionProvider,
    I: InventoryStore<T::Tx>,
    B: BookingStore<T::Tx>,
{
    pub fn new(transactions: T, inventory: I, bookings: B) -> Self {
        Self {
            transactions,
            inventory,
            bookings,
            timeout: DEFAULT_TRANSACTION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn reserve(&self, event_id: Uuid, requester: &str) -> CoreResult<Booking> {
        let booking = Booking::new(Some(Uuid::new_v4()), Some(event_id), requester, BookingStatus::Pending)?;
        self.create_booking(booking).await
    }

    pub async fn create_booking(&self, booking: Booking) -> CoreResult<Booking> {
        self.create_booking_within(booking, self.timeout).await
    }

    /// Run the reservation with an explicit deadline.
    ///
    /// The deadline bounds begin, reserve and insert. When it passes, the in-flight
    /// transaction is dropped, which rolls it back. Commit runs outside the deadline
    /// so a caller never sees `Timeout` for a booking the database already made durable.
    #[instrument(
        name = "reservation",
        skip(self, booking),
        fields(booking_id = %booking.id(), event_id = %booking.event_id())
    )]
    pub async fn create_booking_within(&self, booking: Booking, deadline: Duration) -> CoreResult<Booking> {
        if booking.status() != BookingStatus::Pending {
            return Err(CoreError::InvalidStatus(booking.status().to_string()));
        }

        let tx = match tokio::time::timeout(deadline, self.stage(&booking)).await {
            Ok(Ok(tx)) => tx,
            Ok(Err(err)) => {
                match &err {
                    CoreError::EventFull(_) | CoreError::EventNotFound(_) => warn!(error = %err, "reservation rejected"),
                    _ => error!(error = %err, "reservation failed"),
                }
                return Err(err);
            }
            Err(_) => {
                warn!(?deadline, "reservation timed out, transaction rolled back");
                return Err(CoreError::Timeout(deadline));
            }
        };

        // A failed commit consumes the transaction, so there is nothing left to roll back.
        if let Err(err) = self.transactions.commit(tx).await {
            error!(error = %err, "reservation commit failed");
            return Err(err);
        }

        info!("booking reserved");
        Ok(booking)
    }

    /// Begin, take one spot and insert the booking, returning the still-open transaction.
    async fn stage(&self, booking: &Booking) -> CoreResult<T::Tx> {
        let mut tx = self.transactions.begin().await?;

        if let Err(err) = self.inventory.reserve_spots(&mut tx, booking.event_id(), 1).await {
            self.abort(tx).await;
            return Err(err);
        }

        if let Err(err) = self.bookings.insert_booking(&mut tx, booking).await {
            self.abort(tx).await;
            return Err(err);
        }

        Ok(tx)
    }

    /// Roll back after a failed step. The step's error is what the caller sees;
    /// a rollback failure is only logged.
    async fn abort(&self, tx: T::Tx) {
        if let Err(err) = self.transactions.rollback(tx).await {
            error!(error = %err, "rollback failed");
        }
    }
}

#[async_trait]
impl<T, I, B> BookingService for ReservationCoordinator<T, I, B>
where
    T: TransactionProvider,
    I: InventoryStore<T::Tx>,
    B: BookingStore<T::Tx>,
{
    async fn reserve(&self, event_id: Uuid, requester: &str) -> CoreResult<Booking> {
        ReservationCoordinator::reserve(self, event_id, requester).await
    }

    async fn create_booking(&self, booking: Booking) -> CoreResult<Booking> {
        ReservationCoordinator::create_booking(self, booking).await
    }
}
