use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use ticket_core::repository::{EventRepository, InventoryStore};
use ticket_core::{CoreError, CoreResult, Event, Page};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::db_error;
use crate::transaction::PgTx;

pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
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

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event::restore(
            row.id,
            row.name,
            row.price,
            row.start_at,
            row.end_at,
            row.capacity,
            row.available_spots,
            row.created_at,
            row.updated_at,
        )
    }
}

const EVENT_COLUMNS: &str =
    "id, name, price, start_at, end_at, capacity, available_spots, created_at, updated_at";

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn create_event(&self, event: &Event) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO events (id, name, price, start_at, end_at, capacity, available_spots, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(event.id())
        .bind(event.name())
        .bind(event.price())
        .bind(event.start_at())
        .bind(event.end_at())
        .bind(event.capacity())
        .bind(event.available_spots())
        .bind(event.created_at())
        .bind(event.updated_at())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn get_event(&self, id: Uuid) -> CoreResult<Event> {
        let row: Option<EventRow> =
            sqlx::query_as(&format!("SELECT {} FROM events WHERE id = $1", EVENT_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        row.map(Event::from).ok_or(CoreError::EventNotFound(id))
    }

    async fn list_events(&self, page: Page) -> CoreResult<Vec<Event>> {
        let page = Page::new(page.limit, page.offset);
        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            "SELECT {} FROM events ORDER BY start_at, id LIMIT $1 OFFSET $2",
            EVENT_COLUMNS
        ))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn update_event(&self, event: &Event) -> CoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE events
            SET name = $2, start_at = $3, end_at = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(event.id())
        .bind(event.name())
        .bind(event.start_at())
        .bind(event.end_at())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::EventNotFound(event.id()));
        }
        Ok(())
    }

    async fn delete_event(&self, id: Uuid) -> CoreResult<()> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::EventNotFound(id));
        }
        Ok(())
    }
}

#[async_trait]
impl InventoryStore<PgTx> for PgEventRepository {
    #[instrument(skip(self, tx))]
    async fn reserve_spots(&self, tx: &mut PgTx, event_id: Uuid, spots: i32) -> CoreResult<()> {
        if spots <= 0 {
            return Err(CoreError::InvalidSpotCount(spots));
        }

        // One conditional statement: the row lock it takes is what serializes
        // concurrent reservations on the same event.
        let result = sqlx::query(
            r#"
            UPDATE events
            SET available_spots = available_spots - $2, updated_at = NOW()
            WHERE id = $1 AND available_spots >= $2
            "#,
        )
        .bind(event_id)
        .bind(spots)
        .execute(&mut **tx)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM events WHERE id = $1)")
            .bind(event_id)
            .fetch_one(&mut **tx)
            .await
            .map_err(db_error)?;

        debug!(exists, "no spots taken");
        if exists {
            Err(CoreError::EventFull(event_id))
        } else {
            Err(CoreError::EventNotFound(event_id))
        }
    }
}
