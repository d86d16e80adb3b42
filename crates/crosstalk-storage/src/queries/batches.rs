// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email batch and per-channel message detail rows.
//!
//! Detail tables are keyed by message id (PRIMARY KEY), so the storage layer
//! enforces the one-details-row-per-message constraint.

use crosstalk_core::CrosstalkError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{EmailBatch, EmailDetails, WhatsappDetails};

/// Insert a new email batch.
pub async fn insert_batch(db: &Database, batch: &EmailBatch) -> Result<(), CrosstalkError> {
    let batch = batch.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO email_batches (id, name, description, processed, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![batch.id, batch.name, batch.description, batch.processed, batch.created_at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get an email batch by ID.
pub async fn get_batch(db: &Database, id: &str) -> Result<Option<EmailBatch>, CrosstalkError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT id, name, description, processed, created_at
                 FROM email_batches WHERE id = ?1",
                params![id],
                |row| {
                    Ok(EmailBatch {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                        processed: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            );
            match result {
                Ok(batch) => Ok(Some(batch)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a batch as processed.
pub async fn mark_batch_processed(db: &Database, id: &str) -> Result<(), CrosstalkError> {
    let id_owned = id.to_string();
    let updated = db
        .connection()
        .call(move |conn| {
            let n = conn.execute(
                "UPDATE email_batches SET processed = 1 WHERE id = ?1",
                params![id_owned],
            )?;
            Ok(n)
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    if updated == 0 {
        return Err(CrosstalkError::not_found("batch", id));
    }
    Ok(())
}

/// Insert the email details row for a message.
pub async fn insert_email_details(
    db: &Database,
    details: &EmailDetails,
) -> Result<(), CrosstalkError> {
    let details = details.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO email_details (message_id, batch_id, opens, clicks, spam_score)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    details.message_id,
                    details.batch_id,
                    details.opens,
                    details.clicks,
                    details.spam_score,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get the email details row for a message.
pub async fn get_email_details(
    db: &Database,
    message_id: &str,
) -> Result<Option<EmailDetails>, CrosstalkError> {
    let message_id = message_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT message_id, batch_id, opens, clicks, spam_score
                 FROM email_details WHERE message_id = ?1",
                params![message_id],
                |row| {
                    Ok(EmailDetails {
                        message_id: row.get(0)?,
                        batch_id: row.get(1)?,
                        opens: row.get(2)?,
                        clicks: row.get(3)?,
                        spam_score: row.get(4)?,
                    })
                },
            );
            match result {
                Ok(details) => Ok(Some(details)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record the spam score computed at dispatch time.
pub async fn set_spam_score(
    db: &Database,
    message_id: &str,
    score: f32,
) -> Result<(), CrosstalkError> {
    let message_id = message_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE email_details SET spam_score = ?1 WHERE message_id = ?2",
                params![score, message_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Increment the open counter for tracked email.
pub async fn increment_opens(db: &Database, message_id: &str) -> Result<bool, CrosstalkError> {
    let message_id = message_id.to_string();
    db.connection()
        .call(move |conn| {
            let n = conn.execute(
                "UPDATE email_details SET opens = opens + 1 WHERE message_id = ?1",
                params![message_id],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Increment the click counter for tracked email.
pub async fn increment_clicks(db: &Database, message_id: &str) -> Result<bool, CrosstalkError> {
    let message_id = message_id.to_string();
    db.connection()
        .call(move |conn| {
            let n = conn.execute(
                "UPDATE email_details SET clicks = clicks + 1 WHERE message_id = ?1",
                params![message_id],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert the WhatsApp details row for a message.
pub async fn insert_whatsapp_details(
    db: &Database,
    details: &WhatsappDetails,
) -> Result<(), CrosstalkError> {
    let details = details.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO whatsapp_details (message_id, media_url, media_type)
                 VALUES (?1, ?2, ?3)",
                params![details.message_id, details.media_url, details.media_type],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get the WhatsApp details row for a message.
pub async fn get_whatsapp_details(
    db: &Database,
    message_id: &str,
) -> Result<Option<WhatsappDetails>, CrosstalkError> {
    let message_id = message_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT message_id, media_url, media_type
                 FROM whatsapp_details WHERE message_id = ?1",
                params![message_id],
                |row| {
                    Ok(WhatsappDetails {
                        message_id: row.get(0)?,
                        media_url: row.get(1)?,
                        media_type: row.get(2)?,
                    })
                },
            );
            match result {
                Ok(details) => Ok(Some(details)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}
