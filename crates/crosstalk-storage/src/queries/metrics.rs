// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel metrics rollup rows, UNIQUE per (channel, date).

use crosstalk_core::CrosstalkError;
use rusqlite::params;

use crate::database::Database;
use crate::models::ChannelMetrics;

/// Insert or replace the rollup row for (channel, date).
///
/// The rollup job recomputes a whole day at a time, so an upsert that
/// overwrites every counter is the correct write.
pub async fn upsert_channel_metrics(
    db: &Database,
    metrics: &ChannelMetrics,
) -> Result<(), CrosstalkError> {
    let metrics = metrics.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO channel_metrics
                     (channel_id, date, messages_sent, messages_delivered, messages_read,
                      conversations_started, conversations_completed, average_response_time_secs)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT (channel_id, date) DO UPDATE SET
                     messages_sent = excluded.messages_sent,
                     messages_delivered = excluded.messages_delivered,
                     messages_read = excluded.messages_read,
                     conversations_started = excluded.conversations_started,
                     conversations_completed = excluded.conversations_completed,
                     average_response_time_secs = excluded.average_response_time_secs",
                params![
                    metrics.channel_id,
                    metrics.date,
                    metrics.messages_sent,
                    metrics.messages_delivered,
                    metrics.messages_read,
                    metrics.conversations_started,
                    metrics.conversations_completed,
                    metrics.average_response_time_secs,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get the rollup row for (channel, date).
pub async fn get_channel_metrics(
    db: &Database,
    channel_id: &str,
    date: &str,
) -> Result<Option<ChannelMetrics>, CrosstalkError> {
    let channel_id = channel_id.to_string();
    let date = date.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT channel_id, date, messages_sent, messages_delivered, messages_read,
                        conversations_started, conversations_completed, average_response_time_secs
                 FROM channel_metrics WHERE channel_id = ?1 AND date = ?2",
                params![channel_id, date],
                |row| {
                    Ok(ChannelMetrics {
                        channel_id: row.get(0)?,
                        date: row.get(1)?,
                        messages_sent: row.get(2)?,
                        messages_delivered: row.get(3)?,
                        messages_read: row.get(4)?,
                        conversations_started: row.get(5)?,
                        conversations_completed: row.get(6)?,
                        average_response_time_secs: row.get(7)?,
                    })
                },
            );
            match result {
                Ok(metrics) => Ok(Some(metrics)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Channel;
    use crate::queries::channels::insert_channel;
    use crosstalk_core::ChannelKind;
    use tempfile::tempdir;

    fn make_metrics(sent: i64) -> ChannelMetrics {
        ChannelMetrics {
            channel_id: "ch-1".into(),
            date: "2026-03-01".into(),
            messages_sent: sent,
            messages_delivered: sent / 2,
            messages_read: sent / 4,
            conversations_started: 3,
            conversations_completed: 1,
            average_response_time_secs: 12.5,
        }
    }

    #[tokio::test]
    async fn upsert_overwrites_same_day_row() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db").to_str().unwrap())
            .await
            .unwrap();
        insert_channel(
            &db,
            &Channel {
                id: "ch-1".into(),
                name: "mail".into(),
                kind: ChannelKind::Email,
                configuration: None,
                is_active: true,
            },
        )
        .await
        .unwrap();

        upsert_channel_metrics(&db, &make_metrics(10)).await.unwrap();
        upsert_channel_metrics(&db, &make_metrics(20)).await.unwrap();

        let row = get_channel_metrics(&db, "ch-1", "2026-03-01")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.messages_sent, 20);

        // Still exactly one row for the (channel, date) pair.
        let count: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM channel_metrics", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(count, 1);

        assert!(get_channel_metrics(&db, "ch-1", "2026-03-02").await.unwrap().is_none());
        db.close().await.unwrap();
    }
}
