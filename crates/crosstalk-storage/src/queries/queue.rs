// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue operations for crash-safe outbound dispatch.
//!
//! The dispatcher enqueues message ids, dequeues them under a processing
//! lock, and acknowledges entries after the dispatch attempt regardless of
//! outcome (a failed attempt is terminal for the message, not retried).
//! Entries left in "processing" by a crashed worker are released back to
//! pending once their lock expires.

use crosstalk_core::CrosstalkError;
use rusqlite::params;

use crate::database::Database;
use crate::models::QueueEntry;

/// Enqueue a new item. Returns the auto-generated queue entry ID.
pub async fn enqueue(
    db: &Database,
    queue_name: &str,
    payload: &str,
) -> Result<i64, CrosstalkError> {
    let queue_name = queue_name.to_string();
    let payload = payload.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO queue (queue_name, payload) VALUES (?1, ?2)",
                params![queue_name, payload],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Dequeue the next pending entry from the named queue.
///
/// Atomically selects the oldest pending entry and marks it as "processing"
/// with a 5-minute lock timeout. Returns `None` if the queue is empty.
pub async fn dequeue(db: &Database, queue_name: &str) -> Result<Option<QueueEntry>, CrosstalkError> {
    let queue_name = queue_name.to_string();
    db.connection()
        .call(move |conn| {
            // Use a transaction to atomically find + update the next pending entry.
            let tx = conn.transaction()?;

            let result = {
                let mut stmt = tx.prepare(
                    "SELECT id, queue_name, payload, status, attempts, max_attempts,
                            created_at, updated_at, locked_until
                     FROM queue
                     WHERE queue_name = ?1 AND status = 'pending'
                     ORDER BY id ASC
                     LIMIT 1",
                )?;
                stmt.query_row(params![queue_name], |row| {
                    Ok(QueueEntry {
                        id: row.get(0)?,
                        queue_name: row.get(1)?,
                        payload: row.get(2)?,
                        status: row.get(3)?,
                        attempts: row.get(4)?,
                        max_attempts: row.get(5)?,
                        created_at: row.get(6)?,
                        updated_at: row.get(7)?,
                        locked_until: row.get(8)?,
                    })
                })
            };

            match result {
                Ok(entry) => {
                    tx.execute(
                        "UPDATE queue SET status = 'processing',
                         attempts = attempts + 1,
                         locked_until = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '+5 minutes'),
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                         WHERE id = ?1",
                        params![entry.id],
                    )?;
                    tx.commit()?;

                    // Return the entry with updated status.
                    Ok(Some(QueueEntry {
                        status: "processing".to_string(),
                        attempts: entry.attempts + 1,
                        ..entry
                    }))
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    tx.commit()?;
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Acknowledge a queue entry after its dispatch attempt completed.
///
/// Marks the entry as "completed". Called for failed attempts too: the
/// failure is recorded on the message itself and is terminal there.
pub async fn ack(db: &Database, id: i64) -> Result<(), CrosstalkError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE queue SET status = 'completed',
                 locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Release entries stuck in "processing" past their lock expiry.
///
/// Crash recovery: a worker that died mid-dispatch leaves its entry locked;
/// once the lock expires the entry returns to "pending" for a fresh pickup,
/// unless its attempts are exhausted, in which case it is marked "failed".
/// Returns the number of entries released.
pub async fn release_expired(db: &Database, queue_name: &str) -> Result<usize, CrosstalkError> {
    let queue_name = queue_name.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let released = tx.execute(
                "UPDATE queue SET status = 'pending',
                 locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE queue_name = ?1 AND status = 'processing'
                   AND locked_until IS NOT NULL
                   AND locked_until < strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                   AND attempts < max_attempts",
                params![queue_name],
            )?;
            tx.execute(
                "UPDATE queue SET status = 'failed',
                 locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE queue_name = ?1 AND status = 'processing'
                   AND locked_until IS NOT NULL
                   AND locked_until < strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![queue_name],
            )?;
            tx.commit()?;
            Ok(released)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn enqueue_and_dequeue_lifecycle() {
        let (db, _dir) = setup_db().await;

        let id = enqueue(&db, "dispatch", r#"{"message_id":"m-1"}"#).await.unwrap();
        assert!(id > 0);

        let entry = dequeue(&db, "dispatch").await.unwrap();
        assert!(entry.is_some());
        let entry = entry.unwrap();
        assert_eq!(entry.id, id);
        assert_eq!(entry.status, "processing");
        assert_eq!(entry.attempts, 1);
        assert_eq!(entry.queue_name, "dispatch");
        assert_eq!(entry.payload, r#"{"message_id":"m-1"}"#);

        // Queue should be empty now (no more pending).
        let next = dequeue(&db, "dispatch").await.unwrap();
        assert!(next.is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn ack_marks_completed() {
        let (db, _dir) = setup_db().await;

        let id = enqueue(&db, "dispatch", "payload").await.unwrap();
        let _entry = dequeue(&db, "dispatch").await.unwrap().unwrap();

        ack(&db, id).await.unwrap();

        let status: String = db
            .connection()
            .call(move |conn| -> Result<String, rusqlite::Error> {
                conn.query_row(
                    "SELECT status FROM queue WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(status, "completed");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn dequeue_empty_queue_returns_none() {
        let (db, _dir) = setup_db().await;
        let result = dequeue(&db, "nonexistent").await.unwrap();
        assert!(result.is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn dequeue_is_fifo() {
        let (db, _dir) = setup_db().await;

        let first = enqueue(&db, "dispatch", "one").await.unwrap();
        let second = enqueue(&db, "dispatch", "two").await.unwrap();

        assert_eq!(dequeue(&db, "dispatch").await.unwrap().unwrap().id, first);
        assert_eq!(dequeue(&db, "dispatch").await.unwrap().unwrap().id, second);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn release_expired_restores_abandoned_entries() {
        let (db, _dir) = setup_db().await;

        let id = enqueue(&db, "dispatch", "payload").await.unwrap();
        let _entry = dequeue(&db, "dispatch").await.unwrap().unwrap();

        // Simulate a crashed worker by forcing the lock into the past.
        db.connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "UPDATE queue SET locked_until = '2000-01-01T00:00:00.000Z' WHERE id = ?1",
                    params![id],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let released = release_expired(&db, "dispatch").await.unwrap();
        assert_eq!(released, 1);

        // Entry is dequeueable again.
        let entry = dequeue(&db, "dispatch").await.unwrap().unwrap();
        assert_eq!(entry.id, id);
        assert_eq!(entry.attempts, 2);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn release_expired_fails_exhausted_entries() {
        let (db, _dir) = setup_db().await;

        let id = enqueue(&db, "dispatch", "payload").await.unwrap();

        // Burn through max_attempts (default 3) with expired locks.
        for _ in 0..3 {
            let _entry = dequeue(&db, "dispatch").await.unwrap().unwrap();
            db.connection()
                .call(move |conn| -> Result<(), rusqlite::Error> {
                    conn.execute(
                        "UPDATE queue SET locked_until = '2000-01-01T00:00:00.000Z' WHERE id = ?1",
                        params![id],
                    )?;
                    Ok(())
                })
                .await
                .unwrap();
            release_expired(&db, "dispatch").await.unwrap();
        }

        let status: String = db
            .connection()
            .call(move |conn| -> Result<String, rusqlite::Error> {
                conn.query_row(
                    "SELECT status FROM queue WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(status, "failed");
        assert!(dequeue(&db, "dispatch").await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_writers_no_sqlite_busy() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("concurrent_test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        // Spawn 10 concurrent tasks all writing through the same Database.
        let mut handles = Vec::new();
        for i in 0..10 {
            let conn = db.connection().clone();
            let handle = tokio::spawn(async move {
                conn.call(move |conn| -> Result<(), rusqlite::Error> {
                    conn.execute(
                        "INSERT INTO queue (queue_name, payload) VALUES (?1, ?2)",
                        params![format!("q-{i}"), format!(r#"{{"n":{i}}}"#)],
                    )?;
                    Ok(())
                })
                .await
            });
            handles.push(handle);
        }

        // All should complete without SQLITE_BUSY.
        for handle in handles {
            let result = handle.await.unwrap();
            assert!(result.is_ok(), "concurrent write failed: {result:?}");
        }

        let count: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM queue", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(count, 10);

        db.close().await.unwrap();
    }
}
