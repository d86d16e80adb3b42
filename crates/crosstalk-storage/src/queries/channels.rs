// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel CRUD operations.

use crosstalk_core::CrosstalkError;
use rusqlite::params;

use crate::database::Database;
use crate::models::Channel;
use crate::queries::enum_col;

fn row_to_channel(row: &rusqlite::Row<'_>) -> rusqlite::Result<Channel> {
    let kind_raw: String = row.get(2)?;
    Ok(Channel {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: enum_col(2, &kind_raw)?,
        configuration: row.get(3)?,
        is_active: row.get(4)?,
    })
}

/// Insert a new channel.
pub async fn insert_channel(db: &Database, channel: &Channel) -> Result<(), CrosstalkError> {
    let channel = channel.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO channels (id, name, kind, configuration, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    channel.id,
                    channel.name,
                    channel.kind.to_string(),
                    channel.configuration,
                    channel.is_active,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a channel by ID.
pub async fn get_channel(db: &Database, id: &str) -> Result<Option<Channel>, CrosstalkError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT id, name, kind, configuration, is_active FROM channels WHERE id = ?1",
                params![id],
                row_to_channel,
            );
            match result {
                Ok(channel) => Ok(Some(channel)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List all active channels.
pub async fn list_active_channels(db: &Database) -> Result<Vec<Channel>, CrosstalkError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, kind, configuration, is_active FROM channels
                 WHERE is_active = 1 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map([], row_to_channel)?;
            let mut channels = Vec::new();
            for row in rows {
                channels.push(row?);
            }
            Ok(channels)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Toggle a channel's active flag.
pub async fn set_active(db: &Database, id: &str, is_active: bool) -> Result<(), CrosstalkError> {
    let id_owned = id.to_string();
    let updated = db
        .connection()
        .call(move |conn| {
            let n = conn.execute(
                "UPDATE channels SET is_active = ?1 WHERE id = ?2",
                params![is_active, id_owned],
            )?;
            Ok(n)
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    if updated == 0 {
        return Err(CrosstalkError::not_found("channel", id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosstalk_core::ChannelKind;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_channel(id: &str, kind: ChannelKind) -> Channel {
        Channel {
            id: id.to_string(),
            name: format!("{kind} channel"),
            kind,
            configuration: Some(r#"{"account_id":"acc-1"}"#.to_string()),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn insert_and_get_roundtrips() {
        let (db, _dir) = setup_db().await;
        insert_channel(&db, &make_channel("ch-wa", ChannelKind::Whatsapp))
            .await
            .unwrap();

        let channel = get_channel(&db, "ch-wa").await.unwrap().unwrap();
        assert_eq!(channel.kind, ChannelKind::Whatsapp);
        assert_eq!(channel.configuration.as_deref(), Some(r#"{"account_id":"acc-1"}"#));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_active_excludes_disabled() {
        let (db, _dir) = setup_db().await;
        insert_channel(&db, &make_channel("ch-a", ChannelKind::Email)).await.unwrap();
        insert_channel(&db, &make_channel("ch-b", ChannelKind::Webchat)).await.unwrap();
        set_active(&db, "ch-b", false).await.unwrap();

        let active = list_active_channels(&db).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "ch-a");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn set_active_unknown_channel_is_not_found() {
        let (db, _dir) = setup_db().await;
        let err = set_active(&db, "missing", false).await.unwrap_err();
        assert!(matches!(err, CrosstalkError::NotFound { .. }));
        db.close().await.unwrap();
    }
}
