// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chatbot interaction records: one row per classified inbound turn.

use crosstalk_core::CrosstalkError;
use rusqlite::params;

use crate::database::Database;
use crate::models::Interaction;

fn row_to_interaction(row: &rusqlite::Row<'_>) -> rusqlite::Result<Interaction> {
    Ok(Interaction {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        user_input: row.get(2)?,
        intent_id: row.get(3)?,
        confidence: row.get(4)?,
        response: row.get(5)?,
        feedback_rating: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Insert a new interaction record.
pub async fn insert_interaction(
    db: &Database,
    interaction: &Interaction,
) -> Result<(), CrosstalkError> {
    let interaction = interaction.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO interactions
                     (id, conversation_id, user_input, intent_id, confidence, response,
                      feedback_rating, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    interaction.id,
                    interaction.conversation_id,
                    interaction.user_input,
                    interaction.intent_id,
                    interaction.confidence,
                    interaction.response,
                    interaction.feedback_rating,
                    interaction.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get an interaction by ID.
pub async fn get_interaction(
    db: &Database,
    id: &str,
) -> Result<Option<Interaction>, CrosstalkError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT id, conversation_id, user_input, intent_id, confidence, response,
                        feedback_rating, created_at
                 FROM interactions WHERE id = ?1",
                params![id],
                row_to_interaction,
            );
            match result {
                Ok(interaction) => Ok(Some(interaction)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Set the feedback rating on an interaction. Last write wins.
pub async fn set_feedback(
    db: &Database,
    id: &str,
    rating: i32,
) -> Result<(), CrosstalkError> {
    let id_owned = id.to_string();
    let updated = db
        .connection()
        .call(move |conn| {
            let n = conn.execute(
                "UPDATE interactions SET feedback_rating = ?1 WHERE id = ?2",
                params![rating, id_owned],
            )?;
            Ok(n)
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    if updated == 0 {
        return Err(CrosstalkError::not_found("interaction", id));
    }
    Ok(())
}

/// Interactions for a conversation in creation order.
pub async fn list_for_conversation(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<Interaction>, CrosstalkError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, user_input, intent_id, confidence, response,
                        feedback_rating, created_at
                 FROM interactions WHERE conversation_id = ?1
                 ORDER BY created_at ASC, id ASC",
            )?;
            let rows = stmt.query_map(params![conversation_id], row_to_interaction)?;
            let mut interactions = Vec::new();
            for row in rows {
                interactions.push(row?);
            }
            Ok(interactions)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Channel;
    use crate::now_rfc3339;
    use crate::queries::channels::insert_channel;
    use crate::queries::conversations::get_or_create;
    use crosstalk_core::ChannelKind;
    use tempfile::tempdir;

    async fn setup_db_with_conversation() -> (Database, String, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db").to_str().unwrap())
            .await
            .unwrap();
        insert_channel(
            &db,
            &Channel {
                id: "ch-1".into(),
                name: "chat".into(),
                kind: ChannelKind::Webchat,
                configuration: None,
                is_active: true,
            },
        )
        .await
        .unwrap();
        let conv = get_or_create(&db, "ch-1", "visitor-1").await.unwrap();
        (db, conv.id, dir)
    }

    fn make_interaction(id: &str, conversation_id: &str) -> Interaction {
        Interaction {
            id: id.to_string(),
            conversation_id: conversation_id.to_string(),
            user_input: "what are your hours".to_string(),
            intent_id: Some("in-hours".to_string()),
            confidence: 0.82,
            response: "9-5".to_string(),
            feedback_rating: None,
            created_at: now_rfc3339(),
        }
    }

    #[tokio::test]
    async fn insert_and_get_roundtrips() {
        let (db, conv_id, _dir) = setup_db_with_conversation().await;
        // The intent FK is nullable and only enforced when present.
        let mut interaction = make_interaction("i-1", &conv_id);
        interaction.intent_id = None;
        insert_interaction(&db, &interaction).await.unwrap();

        let fetched = get_interaction(&db, "i-1").await.unwrap().unwrap();
        assert_eq!(fetched.user_input, "what are your hours");
        assert!(fetched.intent_id.is_none());
        assert!(fetched.feedback_rating.is_none());
        assert!((fetched.confidence - 0.82).abs() < 1e-6);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn feedback_is_last_write_wins() {
        let (db, conv_id, _dir) = setup_db_with_conversation().await;
        let mut interaction = make_interaction("i-1", &conv_id);
        interaction.intent_id = None;
        insert_interaction(&db, &interaction).await.unwrap();

        set_feedback(&db, "i-1", 4).await.unwrap();
        set_feedback(&db, "i-1", 2).await.unwrap();

        let fetched = get_interaction(&db, "i-1").await.unwrap().unwrap();
        assert_eq!(fetched.feedback_rating, Some(2));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn feedback_for_unknown_interaction_is_not_found() {
        let (db, _conv_id, _dir) = setup_db_with_conversation().await;
        let err = set_feedback(&db, "missing", 5).await.unwrap_err();
        assert!(matches!(err, CrosstalkError::NotFound { entity: "interaction", .. }));
        db.close().await.unwrap();
    }
}
