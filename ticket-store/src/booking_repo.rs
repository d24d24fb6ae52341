use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use ticket_core::repository::{BookingRepository, BookingStore};
use ticket_core::{Booking, BookingStatus, CoreError, CoreResult, Page};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{booking_insert_error, db_error, tx_error};
use crate::transaction::PgTx;

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lock the row, apply `transition` to the loaded booking and write the new status back.
    async fn transition<F>(&self, id: Uuid, transition: F) -> CoreResult<Booking>
    where
        F: FnOnce(&mut Booking) -> CoreResult<()> + Send,
    {
        let mut tx = self.pool.begin().await.map_err(tx_error)?;

        let row: Option<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE id = $1 FOR UPDATE",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?;

        let mut booking = row
            .ok_or(CoreError::BookingNotFound(id))?
            .into_booking()?;
        transition(&mut booking)?;

        sqlx::query("UPDATE bookings SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(booking.id())
            .bind(booking.status().as_str())
            .bind(booking.updated_at())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(tx_error)?;
        Ok(booking)
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    event_id: Uuid,
    user_email: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self) -> CoreResult<Booking> {
        let status: BookingStatus = self.status.parse()?;
        Ok(Booking::restore(
            self.id,
            self.event_id,
            self.user_email,
            status,
            self.created_at,
            self.updated_at,
        ))
    }
}

const BOOKING_COLUMNS: &str = "id, event_id, user_email, status, created_at, updated_at";

const INSERT_BOOKING: &str = r#"
    INSERT INTO bookings (id, event_id, user_email, status, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6)
"#;

fn insert_query(booking: &Booking) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments> {
    sqlx::query(INSERT_BOOKING)
        .bind(booking.id())
        .bind(booking.event_id())
        .bind(booking.requester().expose().as_str())
        .bind(booking.status().as_str())
        .bind(booking.created_at())
        .bind(booking.updated_at())
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn create_booking(&self, booking: &Booking) -> CoreResult<()> {
        insert_query(booking)
            .execute(&self.pool)
            .await
            .map_err(|e| booking_insert_error(e, booking.event_id()))?;
        Ok(())
    }

    async fn get_booking_by_id(&self, id: Uuid) -> CoreResult<Booking> {
        let row: Option<BookingRow> =
            sqlx::query_as(&format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        row.ok_or(CoreError::BookingNotFound(id))?.into_booking()
    }

    async fn list_bookings(&self, page: Page) -> CoreResult<Vec<Booking>> {
        let page = Page::new(page.limit, page.offset);
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings ORDER BY created_at, id LIMIT $1 OFFSET $2",
            BOOKING_COLUMNS
        ))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(BookingRow::into_booking).collect()
    }

    async fn update_booking(&self, booking: &Booking) -> CoreResult<()> {
        let result = sqlx::query(
            "UPDATE bookings SET user_email = $2, status = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(booking.id())
        .bind(booking.requester().expose().as_str())
        .bind(booking.status().as_str())
        .bind(booking.updated_at())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::BookingNotFound(booking.id()));
        }
        Ok(())
    }

    async fn delete_booking(&self, id: Uuid) -> CoreResult<()> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::BookingNotFound(id));
        }
        Ok(())
    }

    async fn confirm_booking(&self, id: Uuid) -> CoreResult<Booking> {
        self.transition(id, Booking::confirm).await
    }

    async fn cancel_booking(&self, id: Uuid) -> CoreResult<Booking> {
        self.transition(id, Booking::cancel).await
    }
}

#[async_trait]
impl BookingStore<PgTx> for PgBookingRepository {
    #[instrument(skip(self, tx, booking), fields(booking_id = %booking.id()))]
    async fn insert_booking(&self, tx: &mut PgTx, booking: &Booking) -> CoreResult<()> {
        insert_query(booking)
            .execute(&mut **tx)
            .await
            .map_err(|e| booking_insert_error(e, booking.event_id()))?;
        Ok(())
    }
}
