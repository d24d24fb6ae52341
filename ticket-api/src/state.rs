use std::sync::Arc;
use ticket_booking::BookingService;
use ticket_core::repository::{BookingRepository, EventRepository};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub events: Arc<dyn EventRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub reservations: Arc<dyn BookingService>,
    pub auth: AuthConfig,
}
