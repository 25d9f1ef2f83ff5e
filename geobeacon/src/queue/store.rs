//! SQLite-backed durable ping queue.
//!
//! One row per queued sample. All transitions go through short transactions
//! on a single mutex-guarded connection, which makes `lease_next`
//! linearizable with respect to `acknowledge`/`release`: no two callers can
//! lease the same entry.
//!
//! Durability: WAL journal with full synchronous writes, so `enqueue`
//! returns only after the sample would survive a crash. On open, any row
//! left in flight by an unclean shutdown is reset to pending with its
//! attempt count preserved.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Notify;
use tracing::{debug, info};

use super::entry::{EntryId, EntryState, QueueEntry};
use super::error::QueueError;
use crate::ping::LocationSample;

/// Default retry ceiling before an entry becomes permanently failed.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS ping_queue (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    sequence      INTEGER NOT NULL UNIQUE,
    latitude      REAL    NOT NULL,
    longitude     REAL    NOT NULL,
    captured_at   INTEGER NOT NULL,
    state         TEXT    NOT NULL DEFAULT 'pending',
    attempt_count INTEGER NOT NULL DEFAULT 0,
    next_retry_at INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_ping_queue_lease
    ON ping_queue (state, sequence);
";

/// Queue configuration.
#[derive(Clone, Copy, Debug)]
pub struct QueueConfig {
    /// Attempts started before `release` turns an entry into `Failed`.
    pub max_attempts: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Durable, ordered queue of pending location samples.
///
/// Producers append with [`enqueue`]; the single upload worker drains with
/// [`lease_next`] / [`acknowledge`] / [`release`]. The queue survives
/// process restarts; delivered entries are removed, permanently failed
/// entries are retained for inspection until purged.
///
/// [`enqueue`]: PingQueue::enqueue
/// [`lease_next`]: PingQueue::lease_next
/// [`acknowledge`]: PingQueue::acknowledge
/// [`release`]: PingQueue::release
pub struct PingQueue {
    conn: Mutex<Connection>,
    config: QueueConfig,
    enqueue_signal: Notify,
}

impl PingQueue {
    /// Open (creating if needed) a queue at the given database path.
    ///
    /// Runs crash recovery: entries left in flight by an unclean shutdown
    /// are reset to pending.
    pub fn open<P: AsRef<Path>>(path: P, config: QueueConfig) -> Result<Self, QueueError> {
        let conn = Connection::open(path)?;
        Self::init(conn, config)
    }

    /// Open an in-memory queue. Durability is limited to the lifetime of
    /// the instance; intended for tests and demos.
    pub fn open_in_memory(config: QueueConfig) -> Result<Self, QueueError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, config)
    }

    fn init(conn: Connection, config: QueueConfig) -> Result<Self, QueueError> {
        // journal_mode returns the resulting mode as a row
        let _mode: String = conn.query_row("PRAGMA journal_mode=wal", [], |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "FULL")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;

        let queue = Self {
            conn: Mutex::new(conn),
            config,
            enqueue_signal: Notify::new(),
        };

        let recovered = queue.recover()?;
        if recovered > 0 {
            info!(recovered, "Reset in-flight queue entries from unclean shutdown");
        }

        Ok(queue)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, QueueError> {
        self.conn.lock().map_err(|_| QueueError::Corruption {
            detail: "queue connection mutex poisoned".to_string(),
        })
    }

    /// Append a new pending entry; durable before returning.
    ///
    /// Signals the drain loop that work is available.
    pub fn enqueue(&self, sample: &LocationSample) -> Result<EntryId, QueueError> {
        let id = {
            let conn = self.lock()?;
            let inserted = conn.execute(
                "INSERT INTO ping_queue (sequence, latitude, longitude, captured_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    sample.sequence as i64,
                    sample.latitude,
                    sample.longitude,
                    sample.captured_at.timestamp_millis(),
                ],
            );
            match inserted {
                Ok(_) => EntryId::new(conn.last_insert_rowid()),
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == rusqlite::ffi::ErrorCode::ConstraintViolation =>
                {
                    return Err(QueueError::DuplicateSequence(sample.sequence));
                }
                Err(e) => return Err(e.into()),
            }
        };

        debug!(entry_id = %id, sequence = sample.sequence, "Sample enqueued");
        self.enqueue_signal.notify_one();
        Ok(id)
    }

    /// Suspend until a new entry is enqueued.
    ///
    /// A signal sent while nobody is waiting is retained, so the drain
    /// loop cannot miss an enqueue between an empty lease and this call.
    pub async fn notified(&self) {
        self.enqueue_signal.notified().await;
    }

    /// Atomically lease the oldest eligible entry, if any.
    ///
    /// Eligible means pending with `next_retry_at` in the past; ordered by
    /// `sequence`, ties broken by earliest `next_retry_at`. The returned
    /// entry is in flight with its attempt count already incremented.
    pub fn lease_next(&self) -> Result<Option<QueueEntry>, QueueError> {
        let now_ms = Utc::now().timestamp_millis();
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(QueueError::from)?;

        let candidate = tx
            .query_row(
                "SELECT id, sequence, latitude, longitude, captured_at, attempt_count, next_retry_at
                 FROM ping_queue
                 WHERE state = 'pending' AND next_retry_at <= ?1
                 ORDER BY sequence ASC, next_retry_at ASC
                 LIMIT 1",
                params![now_ms],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, u32>(5)?,
                        row.get::<_, i64>(6)?,
                    ))
                },
            )
            .optional()
            .map_err(QueueError::from)?;

        let Some((id, sequence, latitude, longitude, captured_ms, attempts, retry_ms)) = candidate
        else {
            return Ok(None);
        };

        tx.execute(
            "UPDATE ping_queue
             SET state = 'in_flight', attempt_count = attempt_count + 1
             WHERE id = ?1",
            params![id],
        )
        .map_err(QueueError::from)?;
        tx.commit().map_err(QueueError::from)?;

        let entry = QueueEntry {
            id: EntryId::new(id),
            sample: LocationSample {
                latitude,
                longitude,
                captured_at: millis_to_datetime(captured_ms),
                sequence: sequence as u64,
            },
            attempt_count: attempts + 1,
            next_retry_at: millis_to_datetime(retry_ms),
            state: EntryState::InFlight,
        };

        debug!(
            entry_id = %entry.id,
            sequence = entry.sample.sequence,
            attempt = entry.attempt_count,
            "Entry leased"
        );
        Ok(Some(entry))
    }

    /// Confirm delivery: the entry is removed and can never be leased again.
    pub fn acknowledge(&self, id: EntryId) -> Result<(), QueueError> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM ping_queue WHERE id = ?1 AND state = 'in_flight'",
            params![id.raw()],
        )?;
        if removed == 0 {
            return Err(QueueError::NotInFlight(id));
        }
        debug!(entry_id = %id, "Entry delivered and removed");
        Ok(())
    }

    /// Return a leased entry after a failed attempt.
    ///
    /// Becomes pending again with `next_retry_at = now + backoff`, or
    /// permanently failed once the attempt ceiling is reached. Returns the
    /// resulting state.
    pub fn release(&self, id: EntryId, backoff: Duration) -> Result<EntryState, QueueError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(QueueError::from)?;

        let attempts: Option<u32> = tx
            .query_row(
                "SELECT attempt_count FROM ping_queue WHERE id = ?1 AND state = 'in_flight'",
                params![id.raw()],
                |row| row.get(0),
            )
            .optional()
            .map_err(QueueError::from)?;
        let Some(attempts) = attempts else {
            return Err(QueueError::NotInFlight(id));
        };

        let state = if attempts >= self.config.max_attempts {
            tx.execute(
                "UPDATE ping_queue SET state = 'failed' WHERE id = ?1",
                params![id.raw()],
            )
            .map_err(QueueError::from)?;
            EntryState::Failed
        } else {
            let retry_at = Utc::now().timestamp_millis() + backoff.as_millis() as i64;
            tx.execute(
                "UPDATE ping_queue SET state = 'pending', next_retry_at = ?2 WHERE id = ?1",
                params![id.raw(), retry_at],
            )
            .map_err(QueueError::from)?;
            EntryState::Pending
        };

        tx.commit().map_err(QueueError::from)?;
        debug!(entry_id = %id, attempts, state = %state, "Entry released");
        Ok(state)
    }

    /// Permanently fail a leased entry (remote rejected the sample).
    ///
    /// The entry is retained for inspection until purged and is never
    /// leased again.
    pub fn mark_failed(&self, id: EntryId) -> Result<(), QueueError> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE ping_queue SET state = 'failed' WHERE id = ?1 AND state = 'in_flight'",
            params![id.raw()],
        )?;
        if updated == 0 {
            return Err(QueueError::NotInFlight(id));
        }
        debug!(entry_id = %id, "Entry permanently failed");
        Ok(())
    }

    /// Reset abandoned in-flight entries to pending, attempt counts
    /// preserved. Returns how many entries were reset.
    ///
    /// Runs automatically at open; the service also runs it at every
    /// start so a lease abandoned at the previous stop is repaired.
    pub fn recover(&self) -> Result<usize, QueueError> {
        let conn = self.lock()?;
        let reset = conn.execute(
            "UPDATE ping_queue SET state = 'pending' WHERE state = 'in_flight'",
            [],
        )?;
        Ok(reset)
    }

    /// Delete retained failed entries. Returns how many were removed.
    pub fn purge_failed(&self) -> Result<usize, QueueError> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM ping_queue WHERE state = 'failed'", [])?;
        if removed > 0 {
            info!(removed, "Purged failed queue entries");
        }
        Ok(removed)
    }

    /// Highest sequence number currently queued, if any.
    ///
    /// Used to seed the sampler's counter so sequences stay strictly
    /// increasing across restarts while undelivered entries remain.
    pub fn max_sequence(&self) -> Result<Option<u64>, QueueError> {
        let conn = self.lock()?;
        let max: Option<i64> =
            conn.query_row("SELECT MAX(sequence) FROM ping_queue", [], |row| row.get(0))?;
        Ok(max.map(|s| s as u64))
    }

    /// Number of entries awaiting delivery.
    pub fn pending_count(&self) -> Result<u64, QueueError> {
        self.count_state("pending")
    }

    /// Number of entries currently leased.
    pub fn in_flight_count(&self) -> Result<u64, QueueError> {
        self.count_state("in_flight")
    }

    /// Number of permanently failed entries retained for inspection.
    pub fn failed_count(&self) -> Result<u64, QueueError> {
        self.count_state("failed")
    }

    fn count_state(&self, state: &str) -> Result<u64, QueueError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM ping_queue WHERE state = ?1",
            params![state],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Permanently failed entries, ordered by sequence.
    pub fn failed_entries(&self) -> Result<Vec<QueueEntry>, QueueError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, sequence, latitude, longitude, captured_at, attempt_count, next_retry_at
             FROM ping_queue
             WHERE state = 'failed'
             ORDER BY sequence ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(QueueEntry {
                id: EntryId::new(row.get(0)?),
                sample: LocationSample {
                    latitude: row.get(2)?,
                    longitude: row.get(3)?,
                    captured_at: millis_to_datetime(row.get(4)?),
                    sequence: row.get::<_, i64>(1)? as u64,
                },
                attempt_count: row.get(5)?,
                next_retry_at: millis_to_datetime(row.get(6)?),
                state: EntryState::Failed,
            })
        })?;

        let mut entries = Vec::new();
        for entry in rows {
            entries.push(entry?);
        }
        Ok(entries)
    }
}

fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::UNIX_EPOCH)
}
