pub mod migrations;
pub mod models;
pub mod queries;

use anyhow::{Result, bail};
use rusqlite::{Connection, OpenFlags, Transaction};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

const READER_POOL_SIZE: usize = 4;
const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(5);
const LOCK_POLL: Duration = Duration::from_millis(2);

/// SQLite store: one writer shared under a mutex, plus read-only readers
/// handed out round-robin.
///
/// Every operation is bounded by `op_timeout`, covering the wait for a
/// connection as well as SQLite's own lock waits. A write that runs past its
/// deadline is rolled back, so a timeout error always means nothing was
/// written.
pub struct Database {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    reader_idx: AtomicUsize,
    op_timeout: Duration,
}

impl Database {
    pub fn open(path: &Path, op_timeout: Duration) -> Result<Self> {
        let writer = Connection::open(path)?;

        // Readers only work alongside the writer in WAL.
        let mode: String =
            writer.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        writer.pragma_update(None, "foreign_keys", "ON")?;
        writer.busy_timeout(op_timeout)?;

        migrations::run(&writer)?;

        let mut readers = Vec::with_capacity(READER_POOL_SIZE);
        for _ in 0..READER_POOL_SIZE {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            conn.busy_timeout(op_timeout)?;
            readers.push(Mutex::new(conn));
        }

        info!(
            "Store ready at {}: journal={}, readers={}, op timeout {:?}",
            path.display(),
            mode,
            READER_POOL_SIZE,
            op_timeout
        );
        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            reader_idx: AtomicUsize::new(0),
            op_timeout,
        })
    }

    /// Private in-memory store. Reads share the writer connection.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;

        Ok(Self {
            writer: Mutex::new(conn),
            readers: Vec::new(),
            reader_idx: AtomicUsize::new(0),
            op_timeout: DEFAULT_OP_TIMEOUT,
        })
    }

    pub fn with_op_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    pub fn op_timeout(&self) -> Duration {
        self.op_timeout
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        if self.readers.is_empty() {
            return self.with_conn_mut(|conn| f(&*conn));
        }

        let deadline = Instant::now() + self.op_timeout;
        let idx = self.reader_idx.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = lock_until(&self.readers[idx], deadline, "reader")?;
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let deadline = Instant::now() + self.op_timeout;
        let mut conn = lock_until(&self.writer, deadline, "writer")?;
        f(&mut conn)
    }

    /// Run `f` in one transaction on the writer. Commits only if the whole
    /// operation, lock wait included, finished inside the deadline.
    pub(crate) fn with_tx<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let deadline = Instant::now() + self.op_timeout;
        let mut conn = lock_until(&self.writer, deadline, "writer")?;

        let tx = conn.transaction()?;
        let out = f(&tx)?;
        if Instant::now() >= deadline {
            warn!("Write ran past its {:?} deadline, rolling back", self.op_timeout);
            bail!("store operation timed out");
        }
        tx.commit()?;
        Ok(out)
    }
}

fn lock_until<'a>(
    conn: &'a Mutex<Connection>,
    deadline: Instant,
    role: &str,
) -> Result<MutexGuard<'a, Connection>> {
    loop {
        match conn.try_lock() {
            Ok(guard) => return Ok(guard),
            Err(TryLockError::Poisoned(_)) => bail!("{} connection lock poisoned", role),
            Err(TryLockError::WouldBlock) if Instant::now() >= deadline => {
                bail!("timed out waiting for the {} connection", role)
            }
            Err(TryLockError::WouldBlock) => thread::sleep(LOCK_POLL),
        }
    }
}
