use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use ticket_core::repository::TransactionProvider;
use ticket_core::CoreResult;

use crate::error::tx_error;

/// Open Postgres transaction. Dropping it without a commit rolls it back.
pub type PgTx = Transaction<'static, Postgres>;

#[derive(Clone)]
pub struct PgTransactionProvider {
    pool: PgPool,
}

impl PgTransactionProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionProvider for PgTransactionProvider {
    type Tx = PgTx;

    async fn begin(&self) -> CoreResult<PgTx> {
        self.pool.begin().await.map_err(tx_error)
    }

    async fn commit(&self, tx: PgTx) -> CoreResult<()> {
        tx.commit().await.map_err(tx_error)
    }

    async fn rollback(&self, tx: PgTx) -> CoreResult<()> {
        tx.rollback().await.map_err(tx_error)
    }
}
