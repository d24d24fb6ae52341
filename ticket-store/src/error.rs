use ticket_core::CoreError;
use tracing::error;

/// Map a driver error from a plain statement. Anything unexpected is opaque to callers.
pub(crate) fn db_error(err: sqlx::Error) -> CoreError {
    error!(error = %err, "database statement failed");
    CoreError::InternalError(err.to_string())
}

/// Map a failure to open, commit or roll back a transaction.
pub(crate) fn tx_error(err: sqlx::Error) -> CoreError {
    error!(error = %err, "database transaction failed");
    CoreError::TransactionFailure(err.to_string())
}

/// A booking insert that trips the event foreign key means the event vanished.
pub(crate) fn booking_insert_error(err: sqlx::Error, event_id: uuid::Uuid) -> CoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_foreign_key_violation() {
            return CoreError::EventNotFound(event_id);
        }
    }
    db_error(err)
}
