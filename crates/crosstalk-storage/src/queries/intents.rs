// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Intent, response, and knowledge base CRUD operations.

use crosstalk_core::CrosstalkError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{Intent, IntentResponse, KnowledgeBase, KnowledgeEntry};
use crate::queries::json_col;

fn row_to_intent(row: &rusqlite::Row<'_>) -> rusqlite::Result<Intent> {
    let phrases_raw: String = row.get(3)?;
    Ok(Intent {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        training_phrases: json_col(3, &phrases_raw)?,
    })
}

/// Insert a new intent.
pub async fn insert_intent(db: &Database, intent: &Intent) -> Result<(), CrosstalkError> {
    let intent = intent.clone();
    let phrases_json =
        serde_json::to_string(&intent.training_phrases).map_err(|e| CrosstalkError::Storage {
            source: Box::new(e),
        })?;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO intents (id, name, description, training_phrases)
                 VALUES (?1, ?2, ?3, ?4)",
                params![intent.id, intent.name, intent.description, phrases_json],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get an intent by ID.
pub async fn get_intent(db: &Database, id: &str) -> Result<Option<Intent>, CrosstalkError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT id, name, description, training_phrases FROM intents WHERE id = ?1",
                params![id],
                row_to_intent,
            );
            match result {
                Ok(intent) => Ok(Some(intent)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List every intent with its training phrases; the classifier trains on this.
pub async fn list_intents(db: &Database) -> Result<Vec<Intent>, CrosstalkError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, description, training_phrases FROM intents ORDER BY rowid ASC",
            )?;
            let rows = stmt.query_map([], row_to_intent)?;
            let mut intents = Vec::new();
            for row in rows {
                intents.push(row?);
            }
            Ok(intents)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Replace an intent's training phrases (triggers retrain on the next cycle).
pub async fn set_training_phrases(
    db: &Database,
    id: &str,
    phrases: &[String],
) -> Result<(), CrosstalkError> {
    let id_owned = id.to_string();
    let phrases_json = serde_json::to_string(phrases).map_err(|e| CrosstalkError::Storage {
        source: Box::new(e),
    })?;
    let updated = db
        .connection()
        .call(move |conn| {
            let n = conn.execute(
                "UPDATE intents SET training_phrases = ?1 WHERE id = ?2",
                params![phrases_json, id_owned],
            )?;
            Ok(n)
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    if updated == 0 {
        return Err(CrosstalkError::not_found("intent", id));
    }
    Ok(())
}

/// Insert a canned response for an intent.
pub async fn insert_response(
    db: &Database,
    response: &IntentResponse,
) -> Result<(), CrosstalkError> {
    let response = response.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO intent_responses (id, intent_id, text, knowledge_base_id)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    response.id,
                    response.intent_id,
                    response.text,
                    response.knowledge_base_id,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Responses registered for an intent, in insertion order.
pub async fn list_responses_for_intent(
    db: &Database,
    intent_id: &str,
) -> Result<Vec<IntentResponse>, CrosstalkError> {
    let intent_id = intent_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, intent_id, text, knowledge_base_id FROM intent_responses
                 WHERE intent_id = ?1 ORDER BY rowid ASC",
            )?;
            let rows = stmt.query_map(params![intent_id], |row| {
                Ok(IntentResponse {
                    id: row.get(0)?,
                    intent_id: row.get(1)?,
                    text: row.get(2)?,
                    knowledge_base_id: row.get(3)?,
                })
            })?;
            let mut responses = Vec::new();
            for row in rows {
                responses.push(row?);
            }
            Ok(responses)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn row_to_knowledge_base(row: &rusqlite::Row<'_>) -> rusqlite::Result<KnowledgeBase> {
    let entries_raw: String = row.get(3)?;
    Ok(KnowledgeBase {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        entries: json_col(3, &entries_raw)?,
    })
}

/// Insert a new knowledge base.
pub async fn insert_knowledge_base(
    db: &Database,
    kb: &KnowledgeBase,
) -> Result<(), CrosstalkError> {
    let kb = kb.clone();
    let entries_json = serde_json::to_string(&kb.entries).map_err(|e| CrosstalkError::Storage {
        source: Box::new(e),
    })?;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO knowledge_bases (id, name, description, entries)
                 VALUES (?1, ?2, ?3, ?4)",
                params![kb.id, kb.name, kb.description, entries_json],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a knowledge base by ID.
pub async fn get_knowledge_base(
    db: &Database,
    id: &str,
) -> Result<Option<KnowledgeBase>, CrosstalkError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT id, name, description, entries FROM knowledge_bases WHERE id = ?1",
                params![id],
                row_to_knowledge_base,
            );
            match result {
                Ok(kb) => Ok(Some(kb)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Merge entries into a knowledge base.
///
/// Existing keys are updated in place, new keys append at the end, so the
/// insertion order that drives response lookup stays stable.
pub async fn merge_knowledge_entries(
    db: &Database,
    id: &str,
    updates: &[KnowledgeEntry],
) -> Result<KnowledgeBase, CrosstalkError> {
    let id_owned = id.to_string();
    let updates = updates.to_vec();
    let merged = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let result = tx.query_row(
                "SELECT id, name, description, entries FROM knowledge_bases WHERE id = ?1",
                params![id_owned],
                row_to_knowledge_base,
            );
            let mut kb = match result {
                Ok(kb) => kb,
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    tx.commit()?;
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            };

            for update in updates {
                match kb.entries.iter_mut().find(|e| e.key == update.key) {
                    Some(existing) => existing.value = update.value,
                    None => kb.entries.push(update),
                }
            }

            let entries_json = serde_json::to_string(&kb.entries).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    3,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
            tx.execute(
                "UPDATE knowledge_bases SET entries = ?1 WHERE id = ?2",
                params![entries_json, kb.id],
            )?;
            tx.commit()?;
            Ok(Some(kb))
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    merged.ok_or_else(|| CrosstalkError::not_found("knowledge base", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db").to_str().unwrap())
            .await
            .unwrap();
        (db, dir)
    }

    fn make_intent(id: &str, name: &str, phrases: &[&str]) -> Intent {
        Intent {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            training_phrases: phrases.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn intent_roundtrip_with_phrases() {
        let (db, _dir) = setup_db().await;
        let intent = make_intent("in-1", "password_reset", &["reset password", "forgot password"]);
        insert_intent(&db, &intent).await.unwrap();

        let fetched = get_intent(&db, "in-1").await.unwrap().unwrap();
        assert_eq!(fetched.name, "password_reset");
        assert_eq!(fetched.training_phrases.len(), 2);

        set_training_phrases(&db, "in-1", &["reset my password".to_string()])
            .await
            .unwrap();
        let fetched = get_intent(&db, "in-1").await.unwrap().unwrap();
        assert_eq!(fetched.training_phrases, vec!["reset my password".to_string()]);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_intents_preserves_insertion_order() {
        let (db, _dir) = setup_db().await;
        insert_intent(&db, &make_intent("in-b", "billing", &["invoice"])).await.unwrap();
        insert_intent(&db, &make_intent("in-a", "account", &["login"])).await.unwrap();

        let intents = list_intents(&db).await.unwrap();
        assert_eq!(intents.len(), 2);
        assert_eq!(intents[0].id, "in-b");
        assert_eq!(intents[1].id, "in-a");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn responses_list_in_insertion_order() {
        let (db, _dir) = setup_db().await;
        insert_intent(&db, &make_intent("in-1", "hours", &["opening hours"])).await.unwrap();

        for (i, text) in ["We're open 9-5.", "Our hours are 9 to 5."].iter().enumerate() {
            insert_response(
                &db,
                &IntentResponse {
                    id: format!("r-{i}"),
                    intent_id: "in-1".into(),
                    text: text.to_string(),
                    knowledge_base_id: None,
                },
            )
            .await
            .unwrap();
        }

        let responses = list_responses_for_intent(&db, "in-1").await.unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].id, "r-0");

        assert!(list_responses_for_intent(&db, "in-none").await.unwrap().is_empty());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn knowledge_merge_updates_in_place_and_appends() {
        let (db, _dir) = setup_db().await;
        insert_knowledge_base(
            &db,
            &KnowledgeBase {
                id: "kb-1".into(),
                name: "faq".into(),
                description: String::new(),
                entries: vec![
                    KnowledgeEntry { key: "hours".into(), value: "9-5".into() },
                    KnowledgeEntry { key: "address".into(), value: "1 Main St".into() },
                ],
            },
        )
        .await
        .unwrap();

        let merged = merge_knowledge_entries(
            &db,
            "kb-1",
            &[
                KnowledgeEntry { key: "hours".into(), value: "8-6".into() },
                KnowledgeEntry { key: "phone".into(), value: "555-0100".into() },
            ],
        )
        .await
        .unwrap();

        assert_eq!(merged.entries.len(), 3);
        assert_eq!(merged.entries[0].key, "hours");
        assert_eq!(merged.entries[0].value, "8-6");
        assert_eq!(merged.entries[2].key, "phone");

        let err = merge_knowledge_entries(&db, "kb-none", &[]).await.unwrap_err();
        assert!(matches!(err, CrosstalkError::NotFound { .. }));

        db.close().await.unwrap();
    }
}
