use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no database connection available after {0:?}")]
    PoolTimeout(Duration),

    #[error("database pool is closed")]
    PoolClosed,

    #[error("database pool lock poisoned")]
    Poisoned,

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialize {column}: {source}")]
    Serialization {
        column: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("corrupt {column} column on row {id}: {reason}")]
    Corrupt {
        column: &'static str,
        id: String,
        reason: String,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("database task failed: {0}")]
    Task(String),
}

pub type Result<T, E = StorageError> = std::result::Result<T, E>;
