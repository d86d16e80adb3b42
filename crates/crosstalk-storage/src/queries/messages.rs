// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound message CRUD and status lifecycle updates.
//!
//! Status writes carry their own guards: every UPDATE names the statuses it
//! may move from, so a stale writer simply updates zero rows instead of
//! moving a message backward. `delivered_at`/`read_at` are written through
//! `COALESCE` and therefore set at most once.

use crosstalk_core::CrosstalkError;
use crosstalk_core::types::MessageStatus;
use rusqlite::params;

use crate::database::Database;
use crate::models::Message;
use crate::now_rfc3339;
use crate::queries::enum_col;

const MESSAGE_COLS: &str = "id, channel_id, template_id, sender, recipient, subject, content, \
     metadata, status, scheduled_at, queued_at, sent_at, delivered_at, read_at, provider_ref, \
     created_at";

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let status_raw: String = row.get(8)?;
    Ok(Message {
        id: row.get(0)?,
        channel_id: row.get(1)?,
        template_id: row.get(2)?,
        sender: row.get(3)?,
        recipient: row.get(4)?,
        subject: row.get(5)?,
        content: row.get(6)?,
        metadata: row.get(7)?,
        status: enum_col(8, &status_raw)?,
        scheduled_at: row.get(9)?,
        queued_at: row.get(10)?,
        sent_at: row.get(11)?,
        delivered_at: row.get(12)?,
        read_at: row.get(13)?,
        provider_ref: row.get(14)?,
        created_at: row.get(15)?,
    })
}

/// Insert a new message.
pub async fn insert_message(db: &Database, msg: &Message) -> Result<(), CrosstalkError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages
                     (id, channel_id, template_id, sender, recipient, subject, content,
                      metadata, status, scheduled_at, queued_at, sent_at, delivered_at,
                      read_at, provider_ref, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    msg.id,
                    msg.channel_id,
                    msg.template_id,
                    msg.sender,
                    msg.recipient,
                    msg.subject,
                    msg.content,
                    msg.metadata,
                    msg.status.to_string(),
                    msg.scheduled_at,
                    msg.queued_at,
                    msg.sent_at,
                    msg.delivered_at,
                    msg.read_at,
                    msg.provider_ref,
                    msg.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a message by ID.
pub async fn get_message(db: &Database, id: &str) -> Result<Option<Message>, CrosstalkError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {MESSAGE_COLS} FROM messages WHERE id = ?1"),
                params![id],
                row_to_message,
            );
            match result {
                Ok(msg) => Ok(Some(msg)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Move a pending message to `sent`, recording `sent_at` and the provider
/// reference. Returns `false` if the message was not pending (already moved).
pub async fn mark_sent(
    db: &Database,
    id: &str,
    provider_ref: Option<&str>,
) -> Result<bool, CrosstalkError> {
    let id = id.to_string();
    let provider_ref = provider_ref.map(|p| p.to_string());
    db.connection()
        .call(move |conn| {
            let n = conn.execute(
                "UPDATE messages SET status = 'sent', sent_at = ?1, provider_ref = ?2
                 WHERE id = ?3 AND status = 'pending'",
                params![now_rfc3339(), provider_ref, id],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Move a message to the terminal `failed` state, recording the error reason
/// in its metadata. Reachable from any non-terminal state; `read` and
/// `failed` rows are left untouched.
pub async fn mark_failed(
    db: &Database,
    id: &str,
    error_reason: &str,
) -> Result<bool, CrosstalkError> {
    let id = id.to_string();
    let error_reason = error_reason.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let metadata: Option<Option<String>> = tx
                .query_row(
                    "SELECT metadata FROM messages
                     WHERE id = ?1 AND status IN ('pending', 'sent', 'delivered')",
                    params![id],
                    |row| row.get(0),
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;

            let Some(metadata) = metadata else {
                tx.commit()?;
                return Ok(false);
            };

            // Merge the error into existing metadata rather than clobbering it.
            let mut meta: serde_json::Value = metadata
                .as_deref()
                .and_then(|m| serde_json::from_str(m).ok())
                .unwrap_or_else(|| serde_json::json!({}));
            meta["error"] = serde_json::Value::String(error_reason);

            tx.execute(
                "UPDATE messages SET status = 'failed', metadata = ?1
                 WHERE id = ?2 AND status IN ('pending', 'sent', 'delivered')",
                params![meta.to_string(), id],
            )?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Upgrade a sent message to `delivered`, stamping `delivered_at` once.
pub async fn mark_delivered(db: &Database, id: &str) -> Result<bool, CrosstalkError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let n = conn.execute(
                "UPDATE messages SET status = 'delivered',
                     delivered_at = COALESCE(delivered_at, ?1)
                 WHERE id = ?2 AND status = 'sent'",
                params![now_rfc3339(), id],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Upgrade a sent or delivered message to `read`.
///
/// A `read` arriving before `delivered` was recorded still leaves the row
/// consistent: `delivered_at` is backfilled alongside `read_at`, each set
/// only the first time.
pub async fn mark_read(db: &Database, id: &str) -> Result<bool, CrosstalkError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let n = conn.execute(
                "UPDATE messages SET status = 'read',
                     delivered_at = COALESCE(delivered_at, ?1),
                     read_at = COALESCE(read_at, ?1)
                 WHERE id = ?2 AND status IN ('sent', 'delivered')",
                params![now_rfc3339(), id],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Stamp `queued_at` on a message admitted to the dispatch queue.
pub async fn mark_queued(db: &Database, id: &str) -> Result<(), CrosstalkError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET queued_at = COALESCE(queued_at, ?1) WHERE id = ?2",
                params![now_rfc3339(), id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Sent messages holding a provider reference, oldest first, bounded by
/// `limit`. Input set for one reconciliation pass.
pub async fn list_sent_for_reconcile(
    db: &Database,
    limit: usize,
) -> Result<Vec<Message>, CrosstalkError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLS} FROM messages
                 WHERE status = 'sent' AND provider_ref IS NOT NULL
                 ORDER BY sent_at ASC LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit as i64], row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Pending scheduled messages whose time has come and that were never
/// admitted to the dispatch queue.
pub async fn list_due_scheduled(db: &Database, now: &str) -> Result<Vec<Message>, CrosstalkError> {
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLS} FROM messages
                 WHERE status = 'pending' AND queued_at IS NULL
                   AND scheduled_at IS NOT NULL AND scheduled_at <= ?1
                 ORDER BY scheduled_at ASC"
            ))?;
            let rows = stmt.query_map(params![now], row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Count (sent, delivered, read) among messages on a channel whose `sent_at`
/// falls in `[start, end]`. Input for the daily metrics rollup.
pub async fn count_status_in_window(
    db: &Database,
    channel_id: &str,
    start: &str,
    end: &str,
) -> Result<(i64, i64, i64), CrosstalkError> {
    let channel_id = channel_id.to_string();
    let start = start.to_string();
    let end = end.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*),
                        COUNT(CASE WHEN status = 'delivered' THEN 1 END),
                        COUNT(CASE WHEN status = 'read' THEN 1 END)
                 FROM messages
                 WHERE channel_id = ?1 AND sent_at >= ?2 AND sent_at <= ?3",
                params![channel_id, start, end],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Build a fresh pending message with generated id and creation timestamp.
pub fn new_pending_message(
    channel_id: &str,
    recipient: &str,
    content: &str,
) -> Message {
    Message {
        id: uuid::Uuid::new_v4().to_string(),
        channel_id: channel_id.to_string(),
        template_id: None,
        sender: None,
        recipient: recipient.to_string(),
        subject: None,
        content: content.to_string(),
        metadata: None,
        status: MessageStatus::Pending,
        scheduled_at: None,
        queued_at: None,
        sent_at: None,
        delivered_at: None,
        read_at: None,
        provider_ref: None,
        created_at: now_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Channel;
    use crate::queries::channels::insert_channel;
    use crosstalk_core::ChannelKind;
    use tempfile::tempdir;

    async fn setup_db_with_channel() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        insert_channel(
            &db,
            &Channel {
                id: "ch-1".to_string(),
                name: "mail".to_string(),
                kind: ChannelKind::Email,
                configuration: None,
                is_active: true,
            },
        )
        .await
        .unwrap();
        (db, dir)
    }

    async fn insert_pending(db: &Database, id: &str) -> Message {
        let mut msg = new_pending_message("ch-1", "user@example.com", "hello");
        msg.id = id.to_string();
        insert_message(db, &msg).await.unwrap();
        msg
    }

    #[tokio::test]
    async fn insert_and_get_roundtrips() {
        let (db, _dir) = setup_db_with_channel().await;
        insert_pending(&db, "m-1").await;

        let msg = get_message(&db, "m-1").await.unwrap().unwrap();
        assert_eq!(msg.recipient, "user@example.com");
        assert_eq!(msg.status, MessageStatus::Pending);
        assert!(msg.sent_at.is_none());

        assert!(get_message(&db, "nope").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn lifecycle_pending_sent_delivered_read() {
        let (db, _dir) = setup_db_with_channel().await;
        insert_pending(&db, "m-1").await;

        assert!(mark_sent(&db, "m-1", Some("SM123")).await.unwrap());
        let msg = get_message(&db, "m-1").await.unwrap().unwrap();
        assert_eq!(msg.status, MessageStatus::Sent);
        assert!(msg.sent_at.is_some());
        assert_eq!(msg.provider_ref.as_deref(), Some("SM123"));

        assert!(mark_delivered(&db, "m-1").await.unwrap());
        let msg = get_message(&db, "m-1").await.unwrap().unwrap();
        assert_eq!(msg.status, MessageStatus::Delivered);
        let first_delivered_at = msg.delivered_at.clone().unwrap();

        // A second delivered report must not move anything.
        assert!(!mark_delivered(&db, "m-1").await.unwrap());

        assert!(mark_read(&db, "m-1").await.unwrap());
        let msg = get_message(&db, "m-1").await.unwrap().unwrap();
        assert_eq!(msg.status, MessageStatus::Read);
        assert_eq!(msg.delivered_at.as_deref(), Some(first_delivered_at.as_str()));
        assert!(msg.read_at.is_some());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn read_before_delivered_backfills_delivered_at() {
        let (db, _dir) = setup_db_with_channel().await;
        insert_pending(&db, "m-1").await;
        mark_sent(&db, "m-1", Some("SM1")).await.unwrap();

        // Provider reports read while we still hold sent.
        assert!(mark_read(&db, "m-1").await.unwrap());
        let msg = get_message(&db, "m-1").await.unwrap().unwrap();
        assert_eq!(msg.status, MessageStatus::Read);
        assert!(msg.delivered_at.is_some(), "delivered_at must be backfilled");
        assert!(msg.read_at.is_some());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn mark_failed_merges_error_and_is_terminal() {
        let (db, _dir) = setup_db_with_channel().await;
        insert_pending(&db, "m-1").await;
        mark_sent(&db, "m-1", Some("SM1")).await.unwrap();

        assert!(mark_failed(&db, "m-1", "gateway rejected recipient").await.unwrap());
        let msg = get_message(&db, "m-1").await.unwrap().unwrap();
        assert_eq!(msg.status, MessageStatus::Failed);
        let meta: serde_json::Value =
            serde_json::from_str(msg.metadata.as_deref().unwrap()).unwrap();
        assert_eq!(meta["error"], "gateway rejected recipient");

        // Terminal: no further transitions apply.
        assert!(!mark_sent(&db, "m-1", None).await.unwrap());
        assert!(!mark_delivered(&db, "m-1").await.unwrap());
        assert!(!mark_read(&db, "m-1").await.unwrap());
        assert!(!mark_failed(&db, "m-1", "again").await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn read_is_not_failable() {
        let (db, _dir) = setup_db_with_channel().await;
        insert_pending(&db, "m-1").await;
        mark_sent(&db, "m-1", Some("SM1")).await.unwrap();
        mark_read(&db, "m-1").await.unwrap();

        assert!(!mark_failed(&db, "m-1", "late failure").await.unwrap());
        let msg = get_message(&db, "m-1").await.unwrap().unwrap();
        assert_eq!(msg.status, MessageStatus::Read);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reconcile_listing_is_bounded_and_sent_only() {
        let (db, _dir) = setup_db_with_channel().await;
        for i in 0..5 {
            insert_pending(&db, &format!("m-{i}")).await;
            mark_sent(&db, &format!("m-{i}"), Some(&format!("SM{i}"))).await.unwrap();
        }
        // One delivered row must drop out of the reconcile set.
        mark_delivered(&db, "m-0").await.unwrap();
        // A sent row without provider_ref has nothing to poll.
        insert_pending(&db, "m-norref").await;
        mark_sent(&db, "m-norref", None).await.unwrap();

        let batch = list_sent_for_reconcile(&db, 3).await.unwrap();
        assert_eq!(batch.len(), 3);
        assert!(batch.iter().all(|m| m.status == MessageStatus::Sent));
        assert!(batch.iter().all(|m| m.provider_ref.is_some()));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn due_scheduled_listing_skips_queued_and_future() {
        let (db, _dir) = setup_db_with_channel().await;

        let mut due = new_pending_message("ch-1", "a@example.com", "due");
        due.id = "m-due".into();
        due.scheduled_at = Some("2026-01-01T00:00:00.000Z".into());
        insert_message(&db, &due).await.unwrap();

        let mut future = new_pending_message("ch-1", "b@example.com", "future");
        future.id = "m-future".into();
        future.scheduled_at = Some("2999-01-01T00:00:00.000Z".into());
        insert_message(&db, &future).await.unwrap();

        let mut queued = new_pending_message("ch-1", "c@example.com", "queued");
        queued.id = "m-queued".into();
        queued.scheduled_at = Some("2026-01-01T00:00:00.000Z".into());
        insert_message(&db, &queued).await.unwrap();
        mark_queued(&db, "m-queued").await.unwrap();

        let due_now = list_due_scheduled(&db, &now_rfc3339()).await.unwrap();
        assert_eq!(due_now.len(), 1);
        assert_eq!(due_now[0].id, "m-due");

        db.close().await.unwrap();
    }
}
