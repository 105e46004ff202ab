use rusqlite::Connection;
use tracing::info;

use crate::error::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id              TEXT PRIMARY KEY,
                username        TEXT NOT NULL UNIQUE,
                password_hash   TEXT NOT NULL,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE sessions (
                id          TEXT PRIMARY KEY,
                data        TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                expires_at  TEXT NOT NULL
            );

            CREATE INDEX idx_sessions_expires ON sessions(expires_at);

            CREATE TABLE uploads (
                id              TEXT PRIMARY KEY,
                title           TEXT NOT NULL,
                caption         TEXT NOT NULL,
                filename        TEXT NOT NULL,
                content_type    TEXT NOT NULL,
                metadata        TEXT NOT NULL,
                created_at      TEXT NOT NULL,
                modified_at     TEXT NOT NULL
            );

            CREATE INDEX idx_uploads_created ON uploads(created_at);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("database migrations complete");
    Ok(())
}
