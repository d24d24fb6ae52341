pub mod coordinator;
pub mod memory;

pub use coordinator::{BookingService, ReservationCoordinator, DEFAULT_TRANSACTION_TIMEOUT};
pub use memory::InMemoryStore;
