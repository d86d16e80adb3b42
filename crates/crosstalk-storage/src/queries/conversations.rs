// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation store: get-or-create lookup and ordered message history.
//!
//! A conversation is uniquely identified by `(channel_id, external_id)`.
//! Creation is always get-or-create; the unique index plus the single-writer
//! connection make duplicate rows impossible under concurrent inbound events.

use crosstalk_core::CrosstalkError;
use crosstalk_core::types::{Attachment, Direction};
use rusqlite::params;

use crate::database::Database;
use crate::models::{Conversation, ConversationMessage};
use crate::now_rfc3339;
use crate::queries::{enum_col, json_col};

fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    let tags_raw: String = row.get(5)?;
    Ok(Conversation {
        id: row.get(0)?,
        channel_id: row.get(1)?,
        user_id: row.get(2)?,
        external_id: row.get(3)?,
        metadata: row.get(4)?,
        tags: json_col(5, &tags_raw)?,
        started_at: row.get(6)?,
        last_message_at: row.get(7)?,
    })
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConversationMessage> {
    let direction_raw: String = row.get(2)?;
    let attachments_raw: String = row.get(4)?;
    Ok(ConversationMessage {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        direction: enum_col(2, &direction_raw)?,
        content: row.get(3)?,
        attachments: json_col(4, &attachments_raw)?,
        metadata: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const CONVERSATION_COLS: &str =
    "id, channel_id, user_id, external_id, metadata, tags, started_at, last_message_at";

const MESSAGE_COLS: &str =
    "id, conversation_id, direction, content, attachments, metadata, created_at";

/// Atomic lookup-or-insert for the conversation keyed by
/// `(channel_id, external_id)`.
///
/// All callers racing on the same key receive the same row: the insert and
/// the select run inside one serialized writer turn, and the unique index
/// absorbs the conflict.
pub async fn get_or_create(
    db: &Database,
    channel_id: &str,
    external_id: &str,
) -> Result<Conversation, CrosstalkError> {
    let channel_id = channel_id.to_string();
    let external_id = external_id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let id = uuid::Uuid::new_v4().to_string();
            let now = now_rfc3339();
            tx.execute(
                "INSERT INTO conversations
                     (id, channel_id, user_id, external_id, metadata, tags, started_at, last_message_at)
                 VALUES (?1, ?2, NULL, ?3, NULL, '[]', ?4, ?4)
                 ON CONFLICT (channel_id, external_id) DO NOTHING",
                params![id, channel_id, external_id, now],
            )?;
            let conversation = tx.query_row(
                &format!(
                    "SELECT {CONVERSATION_COLS} FROM conversations
                     WHERE channel_id = ?1 AND external_id = ?2"
                ),
                params![channel_id, external_id],
                row_to_conversation,
            )?;
            tx.commit()?;
            Ok(conversation)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a conversation by ID.
pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<Conversation>, CrosstalkError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {CONVERSATION_COLS} FROM conversations WHERE id = ?1"),
                params![id],
                row_to_conversation,
            );
            match result {
                Ok(conversation) => Ok(Some(conversation)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Replace a conversation's free-form metadata JSON.
pub async fn set_metadata(
    db: &Database,
    id: &str,
    metadata: Option<&str>,
) -> Result<(), CrosstalkError> {
    let id_owned = id.to_string();
    let metadata = metadata.map(|m| m.to_string());
    let updated = db
        .connection()
        .call(move |conn| {
            let n = conn.execute(
                "UPDATE conversations SET metadata = ?1 WHERE id = ?2",
                params![metadata, id_owned],
            )?;
            Ok(n)
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    if updated == 0 {
        return Err(CrosstalkError::not_found("conversation", id));
    }
    Ok(())
}

/// Append a message to a conversation in creation-time order.
///
/// Bumps the conversation's `last_message_at` to the new message's
/// `created_at` in the same transaction.
pub async fn append_message(
    db: &Database,
    conversation_id: &str,
    direction: Direction,
    content: &str,
    attachments: &[Attachment],
    metadata: Option<&str>,
) -> Result<ConversationMessage, CrosstalkError> {
    let conversation_id_owned = conversation_id.to_string();
    let content = content.to_string();
    let attachments = attachments.to_vec();
    let attachments_json = serde_json::to_string(&attachments).map_err(|e| {
        CrosstalkError::Storage {
            source: Box::new(e),
        }
    })?;
    let metadata = metadata.map(|m| m.to_string());

    let appended = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let message = ConversationMessage {
                id: uuid::Uuid::new_v4().to_string(),
                conversation_id: conversation_id_owned,
                direction,
                content,
                attachments,
                metadata,
                created_at: now_rfc3339(),
            };
            // Bump first: a zero-row update means the conversation does not
            // exist, and dropping the transaction rolls everything back.
            let bumped = tx.execute(
                "UPDATE conversations SET last_message_at = ?1 WHERE id = ?2",
                params![message.created_at, message.conversation_id],
            )?;
            if bumped == 0 {
                return Ok(None);
            }
            tx.execute(
                "INSERT INTO conversation_messages
                     (id, conversation_id, direction, content, attachments, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    message.id,
                    message.conversation_id,
                    message.direction.to_string(),
                    message.content,
                    attachments_json,
                    message.metadata,
                    message.created_at,
                ],
            )?;
            tx.commit()?;
            Ok(Some(message))
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    appended.ok_or_else(|| CrosstalkError::not_found("conversation", conversation_id))
}

/// Most recent message of a conversation by creation order, or `None`.
pub async fn last_message(
    db: &Database,
    conversation_id: &str,
) -> Result<Option<ConversationMessage>, CrosstalkError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!(
                    "SELECT {MESSAGE_COLS} FROM conversation_messages
                     WHERE conversation_id = ?1
                     ORDER BY created_at DESC, rowid DESC LIMIT 1"
                ),
                params![conversation_id],
                row_to_message,
            );
            match result {
                Ok(message) => Ok(Some(message)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List a conversation's messages in creation-time order.
///
/// `since` is an exclusive `created_at` cursor: passing the timestamp of the
/// last message already consumed makes the sequence restartable.
pub async fn list_messages(
    db: &Database,
    conversation_id: &str,
    since: Option<&str>,
    limit: Option<i64>,
) -> Result<Vec<ConversationMessage>, CrosstalkError> {
    let conversation_id = conversation_id.to_string();
    let since = since.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            let mut sql = format!(
                "SELECT {MESSAGE_COLS} FROM conversation_messages
                 WHERE conversation_id = ?1"
            );
            if since.is_some() {
                sql.push_str(" AND created_at > ?2");
            }
            // rowid breaks same-millisecond ties in insertion order.
            sql.push_str(" ORDER BY created_at ASC, rowid ASC");
            if let Some(lim) = limit {
                sql.push_str(&format!(" LIMIT {lim}"));
            }

            let mut messages = Vec::new();
            let mut stmt = conn.prepare(&sql)?;
            match &since {
                Some(cursor) => {
                    let rows = stmt.query_map(params![conversation_id, cursor], row_to_message)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
                None => {
                    let rows = stmt.query_map(params![conversation_id], row_to_message)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List conversations on a channel whose `started_at` falls in `[start, end]`.
///
/// Used by the daily metrics rollup.
pub async fn list_started_between(
    db: &Database,
    channel_id: &str,
    start: &str,
    end: &str,
) -> Result<Vec<Conversation>, CrosstalkError> {
    let channel_id = channel_id.to_string();
    let start = start.to_string();
    let end = end.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLS} FROM conversations
                 WHERE channel_id = ?1 AND started_at >= ?2 AND started_at <= ?3
                 ORDER BY started_at ASC"
            ))?;
            let rows = stmt.query_map(params![channel_id, start, end], row_to_conversation)?;
            let mut conversations = Vec::new();
            for row in rows {
                conversations.push(row?);
            }
            Ok(conversations)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
