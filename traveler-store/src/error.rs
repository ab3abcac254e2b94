use traveler_core::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("Mail error: {0}")]
    Mail(String),
    #[error("Queue error: {0}")]
    Queue(String),
}

// Postgres SQLSTATE for foreign_key_violation
const FOREIGN_KEY_VIOLATION: &str = "23503";

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(sqlx::Error::Database(db))
                if db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) =>
            {
                CoreError::NotFound("Flight not found".to_string())
            }
            StoreError::Mail(msg) => CoreError::Notification(msg),
            StoreError::Queue(msg) => CoreError::Queue(msg),
            other => CoreError::Storage(other.to_string()),
        }
    }
}

pub(crate) fn db_err(err: sqlx::Error) -> CoreError {
    StoreError::Database(err).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_core() {
        assert!(matches!(
            CoreError::from(StoreError::Database(sqlx::Error::RowNotFound)),
            CoreError::Storage(_)
        ));
        assert!(matches!(
            CoreError::from(StoreError::Mail("relay refused".to_string())),
            CoreError::Notification(_)
        ));
        assert!(matches!(
            CoreError::from(StoreError::Queue("closed".to_string())),
            CoreError::Queue(_)
        ));
    }
}
