pub mod error;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod timestamp;

use std::ops::Deref;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::Connection;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{info, warn};

pub use error::{Result, StorageError};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection pool sizing. Fixed for the life of the process.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub size: usize,
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: 10,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

struct Pool {
    idle: Mutex<Vec<Connection>>,
    permits: Arc<Semaphore>,
    acquire_timeout: Duration,
}

/// Handle to the SQLite store. Cloning is cheap; all clones share one pool.
#[derive(Clone)]
pub struct Database {
    pool: Arc<Pool>,
}

impl Database {
    pub fn open(path: &Path, config: PoolConfig) -> Result<Self> {
        let size = config.size.max(1);
        let mut conns = Vec::with_capacity(size);
        for i in 0..size {
            let conn = Connection::open(path)?;
            // WAL mode for concurrent reads
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            if i == 0 {
                migrations::run(&conn)?;
            }
            conns.push(conn);
        }

        info!(
            "Database opened at {} ({} pooled connections)",
            path.display(),
            size
        );
        Ok(Self {
            pool: Arc::new(Pool {
                idle: Mutex::new(conns),
                permits: Arc::new(Semaphore::new(size)),
                acquire_timeout: config.acquire_timeout,
            }),
        })
    }

    /// Wait for a free connection. The returned guard hands the connection
    /// back to the pool when dropped, on every exit path.
    pub async fn acquire(&self) -> Result<PooledConnection> {
        let permit = match tokio::time::timeout(
            self.pool.acquire_timeout,
            self.pool.permits.clone().acquire_owned(),
        )
        .await
        {
            Err(_) => return Err(StorageError::PoolTimeout(self.pool.acquire_timeout)),
            Ok(Err(_)) => return Err(StorageError::PoolClosed),
            Ok(Ok(permit)) => permit,
        };

        let conn = self
            .pool
            .idle
            .lock()
            .map_err(|_| StorageError::Poisoned)?
            .pop()
            .ok_or(StorageError::PoolClosed)?;

        Ok(PooledConnection {
            conn: Some(conn),
            pool: self.pool.clone(),
            _permit: permit,
        })
    }

    /// Run a read on a pooled connection off the async runtime.
    pub async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.acquire().await?;
        tokio::task::spawn_blocking(move || f(&*conn))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }

    /// Connections currently idle in the pool.
    pub fn idle_connections(&self) -> usize {
        self.pool.permits.available_permits()
    }

    /// Refuse all further acquisitions. Connections in use are dropped as
    /// their guards are released.
    pub fn close(&self) {
        self.pool.permits.close();
        match self.pool.idle.lock() {
            Ok(mut idle) => idle.clear(),
            Err(_) => warn!("Database pool lock poisoned during close"),
        }
        info!("Database pool closed");
    }
}

pub struct PooledConnection {
    conn: Option<Connection>,
    pool: Arc<Pool>,
    _permit: OwnedSemaphorePermit,
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("pooled connection taken before drop")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else { return };
        if self.pool.permits.is_closed() {
            return;
        }
        match self.pool.idle.lock() {
            Ok(mut idle) => idle.push(conn),
            Err(poisoned) => poisoned.into_inner().push(conn),
        }
    }
}
