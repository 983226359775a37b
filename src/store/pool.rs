//! Bounded SQLite connection pool.
//!
//! SQLite connections are not `Sync`, so each job checks one out for the
//! duration of its transaction. At most `max_connections` are open at a
//! time; callers beyond that wait for a connection to be returned.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rusqlite::Connection;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::error::StoreError;

struct PoolInner {
    path: PathBuf,
    busy_timeout: Duration,
    idle: Mutex<Vec<Connection>>,
}

impl PoolInner {
    fn take_idle(&self) -> Option<Connection> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).pop()
    }

    fn put_idle(&self, conn: Connection) {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).push(conn);
    }
}

/// Pool of connections to one database file.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
    permits: Arc<Semaphore>,
    max_connections: usize,
}

impl ConnectionPool {
    /// Create a pool and open its first connection.
    pub fn open(path: impl AsRef<Path>, max_connections: usize, busy_timeout: Duration) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let max_connections = max_connections.max(1);
        let first = open_connection(&path, busy_timeout)?;

        Ok(Self {
            inner: Arc::new(PoolInner {
                path,
                busy_timeout,
                idle: Mutex::new(vec![first]),
            }),
            permits: Arc::new(Semaphore::new(max_connections)),
            max_connections,
        })
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Check out a connection, waiting while all are in use.
    pub async fn acquire(&self) -> Result<PooledConnection, StoreError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| StoreError::PoolClosed)?;

        let conn = match self.inner.take_idle() {
            Some(conn) => conn,
            None => {
                debug!(path = %self.inner.path.display(), "opening pooled connection");
                open_connection(&self.inner.path, self.inner.busy_timeout)?
            }
        };

        Ok(PooledConnection {
            conn: Some(conn),
            pool: Arc::clone(&self.inner),
            _permit: permit,
        })
    }

    /// Wait for every checked-out connection to come back, then close all.
    pub async fn close(&self) {
        let all = u32::try_from(self.max_connections).unwrap_or(u32::MAX);
        if let Ok(permits) = self.permits.acquire_many(all).await {
            self.permits.close();
            drop(permits);
        }

        let idle = std::mem::take(&mut *self.inner.idle.lock().unwrap_or_else(PoisonError::into_inner));
        for conn in idle {
            if let Err((_, e)) = conn.close() {
                debug!(error = %e, "error closing connection");
            }
        }
    }
}

/// A connection checked out of the pool; returned on drop.
pub struct PooledConnection {
    conn: Option<Connection>,
    pool: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        // Only `None` inside `drop`
        self.conn.as_ref().unwrap_or_else(|| unreachable!("connection used after release"))
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().unwrap_or_else(|| unreachable!("connection used after release"))
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            // A connection left inside a transaction is not reusable
            if conn.is_autocommit() {
                self.pool.put_idle(conn);
            }
        }
    }
}

/// Open and configure one connection.
pub(crate) fn open_connection(path: &Path, busy_timeout: Duration) -> Result<Connection, StoreError> {
    let conn = Connection::open(path).map_err(|source| StoreError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    configure(&conn, busy_timeout)?;
    Ok(conn)
}

/// Apply per-connection settings.
pub(crate) fn configure(conn: &Connection, busy_timeout: Duration) -> Result<(), StoreError> {
    conn.busy_timeout(busy_timeout).map_err(StoreError::Schema)?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(StoreError::Schema)?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
        .map_err(StoreError::Schema)?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .map_err(StoreError::Schema)?;
    Ok(())
}
