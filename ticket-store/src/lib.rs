pub mod app_config;
pub mod booking_repo;
pub mod database;
mod error;
pub mod event_repo;
pub mod transaction;

pub use booking_repo::PgBookingRepository;
pub use database::DbClient;
pub use event_repo::PgEventRepository;
pub use transaction::{PgTransactionProvider, PgTx};
