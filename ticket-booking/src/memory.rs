//! In-memory implementation of every store trait.
//!
//! A transaction takes the state lock for its whole lifetime and works on a staged
//! copy, so concurrent reservations are serialized the way a serializable database
//! would serialize them. Commit publishes the copy; rollback or drop discards it.
//! Faults can be injected at each step of the reservation to exercise rollback paths.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use ticket_core::repository::{
    BookingRepository, BookingStore, EventRepository, InventoryStore, TransactionProvider,
};
use ticket_core::{Booking, CoreError, CoreResult, Event, Page};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// A point in the reservation sequence where a fault can be injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Begin,
    Reserve,
    InsertBooking,
    Commit,
}

#[derive(Debug, Default)]
struct Faults {
    fail: Option<Step>,
    stall: Option<(Step, Duration)>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    events: HashMap<Uuid, Event>,
    bookings: HashMap<Uuid, Booking>,
}

impl MemoryState {
    fn take_spots(&mut self, event_id: Uuid, spots: i32) -> CoreResult<()> {
        let event = self
            .events
            .get_mut(&event_id)
            .ok_or(CoreError::EventNotFound(event_id))?;

        if event.available_spots() < spots {
            return Err(CoreError::EventFull(event_id));
        }

        *event = Event::restore(
            event.id(),
            event.name().to_string(),
            event.price(),
            event.start_at(),
            event.end_at(),
            event.capacity(),
            event.available_spots() - spots,
            event.created_at(),
            Utc::now(),
        );
        Ok(())
    }

    fn insert_booking(&mut self, booking: &Booking) -> CoreResult<()> {
        if !self.events.contains_key(&booking.event_id()) {
            return Err(CoreError::EventNotFound(booking.event_id()));
        }
        if self.bookings.contains_key(&booking.id()) {
            return Err(CoreError::InternalError(format!("duplicate booking id {}", booking.id())));
        }
        self.bookings.insert(booking.id(), booking.clone());
        Ok(())
    }
}

/// Handle for one in-memory transaction.
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
    faults: Arc<StdMutex<Faults>>,
    rollbacks: Arc<AtomicUsize>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future call to `step` fail until [`InMemoryStore::clear_faults`].
    pub fn fail_at(&self, step: Step) {
        self.faults().fail = Some(step);
    }

    /// Make `step` sleep for `delay` before doing its work.
    pub fn stall_at(&self, step: Step, delay: Duration) {
        self.faults().stall = Some((step, delay));
    }

    pub fn clear_faults(&self) {
        *self.faults() = Faults::default();
    }

    /// Number of explicit rollbacks performed so far.
    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    /// Count of committed bookings referencing `event_id`.
    pub async fn bookings_for_event(&self, event_id: Uuid) -> usize {
        self.state
            .lock()
            .await
            .bookings
            .values()
            .filter(|b| b.event_id() == event_id)
            .count()
    }

    fn faults(&self) -> std::sync::MutexGuard<'_, Faults> {
        // A poisoned lock only means a test panicked mid-update; the data is still usable.
        self.faults.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn checkpoint(&self, step: Step) -> CoreResult<()> {
        let (fail, stall) = {
            let faults = self.faults();
            (faults.fail == Some(step), faults.stall.filter(|(s, _)| *s == step))
        };

        if let Some((_, delay)) = stall {
            tokio::time::sleep(delay).await;
        }

        if fail {
            let message = format!("injected failure at {:?}", step);
            return Err(match step {
                Step::Begin | Step::Commit => CoreError::TransactionFailure(message),
                Step::Reserve | Step::InsertBooking => CoreError::InternalError(message),
            });
        }
        Ok(())
    }

    async fn with_booking<F>(&self, id: Uuid, transition: F) -> CoreResult<Booking>
    where
        F: FnOnce(&mut Booking) -> CoreResult<()> + Send,
    {
        let mut state = self.state.lock().await;
        let booking = state.bookings.get_mut(&id).ok_or(CoreError::BookingNotFound(id))?;
        transition(booking)?;
        Ok(booking.clone())
    }
}

#[async_trait]
impl TransactionProvider for InMemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> CoreResult<MemoryTx> {
        self.checkpoint(Step::Begin).await?;
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryTx { guard, staged })
    }

    async fn commit(&self, tx: MemoryTx) -> CoreResult<()> {
        self.checkpoint(Step::Commit).await?;
        let MemoryTx { mut guard, staged } = tx;
        *guard = staged;
        Ok(())
    }

    async fn rollback(&self, tx: MemoryTx) -> CoreResult<()> {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        drop(tx);
        Ok(())
    }
}

#[async_trait]
impl InventoryStore<MemoryTx> for InMemoryStore {
    async fn reserve_spots(&self, tx: &mut MemoryTx, event_id: Uuid, spots: i32) -> CoreResult<()> {
        if spots <= 0 {
            return Err(CoreError::InvalidSpotCount(spots));
        }
        self.checkpoint(Step::Reserve).await?;
        tx.staged.take_spots(event_id, spots)
    }
}

#[async_trait]
impl BookingStore<MemoryTx> for InMemoryStore {
    async fn insert_booking(&self, tx: &mut MemoryTx, booking: &Booking) -> CoreResult<()> {
        self.checkpoint(Step::InsertBooking).await?;
        tx.staged.insert_booking(booking)
    }
}

#[async_trait]
impl EventRepository for InMemoryStore {
    async fn create_event(&self, event: &Event) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        if state.events.contains_key(&event.id()) {
            return Err(CoreError::InternalError(format!("duplicate event id {}", event.id())));
        }
        state.events.insert(event.id(), event.clone());
        Ok(())
    }

    async fn get_event(&self, id: Uuid) -> CoreResult<Event> {
        self.state
            .lock()
            .await
            .events
            .get(&id)
            .cloned()
            .ok_or(CoreError::EventNotFound(id))
    }

    async fn list_events(&self, page: Page) -> CoreResult<Vec<Event>> {
        let state = self.state.lock().await;
        let mut events: Vec<Event> = state.events.values().cloned().collect();
        events.sort_by_key(|e| (e.start_at(), e.id()));
        Ok(paginate(events, page))
    }

    async fn update_event(&self, event: &Event) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        let stored = state
            .events
            .get_mut(&event.id())
            .ok_or(CoreError::EventNotFound(event.id()))?;

        // Price and inventory keep their stored values.
        *stored = Event::restore(
            stored.id(),
            event.name().to_string(),
            stored.price(),
            event.start_at(),
            event.end_at(),
            stored.capacity(),
            stored.available_spots(),
            stored.created_at(),
            Utc::now(),
        );
        Ok(())
    }

    async fn delete_event(&self, id: Uuid) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        state.events.remove(&id).ok_or(CoreError::EventNotFound(id))?;
        state.bookings.retain(|_, b| b.event_id() != id);
        Ok(())
    }
}

#[async_trait]
impl BookingRepository for InMemoryStore {
    async fn create_booking(&self, booking: &Booking) -> CoreResult<()> {
        self.state.lock().await.insert_booking(booking)
    }

    async fn get_booking_by_id(&self, id: Uuid) -> CoreResult<Booking> {
        self.state
            .lock()
            .await
            .bookings
            .get(&id)
            .cloned()
            .ok_or(CoreError::BookingNotFound(id))
    }

    async fn list_bookings(&self, page: Page) -> CoreResult<Vec<Booking>> {
        let state = self.state.lock().await;
        let mut bookings: Vec<Booking> = state.bookings.values().cloned().collect();
        bookings.sort_by_key(|b| (b.created_at(), b.id()));
        Ok(paginate(bookings, page))
    }

    async fn update_booking(&self, booking: &Booking) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        let stored = state
            .bookings
            .get_mut(&booking.id())
            .ok_or(CoreError::BookingNotFound(booking.id()))?;
        *stored = booking.clone();
        Ok(())
    }

    async fn delete_booking(&self, id: Uuid) -> CoreResult<()> {
        self.state
            .lock()
            .await
            .bookings
            .remove(&id)
            .map(|_| ())
            .ok_or(CoreError::BookingNotFound(id))
    }

    async fn confirm_booking(&self, id: Uuid) -> CoreResult<Booking> {
        self.with_booking(id, Booking::confirm).await
    }

    async fn cancel_booking(&self, id: Uuid) -> CoreResult<Booking> {
        self.with_booking(id, Booking::cancel).await
    }
}

fn paginate<T>(items: Vec<T>, page: Page) -> Vec<T> {
    let page = Page::new(page.limit, page.offset);
    items
        .into_iter()
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .collect()
}
