// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handoff rule and auto-reply CRUD operations.

use crosstalk_core::CrosstalkError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{AutoReply, HandoffRule};

/// Insert a new handoff rule.
pub async fn insert_handoff_rule(db: &Database, rule: &HandoffRule) -> Result<(), CrosstalkError> {
    let rule = rule.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO handoff_rules (id, intent_id, confidence_threshold, is_active)
                 VALUES (?1, ?2, ?3, ?4)",
                params![rule.id, rule.intent_id, rule.confidence_threshold, rule.is_active],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All active handoff rules.
///
/// Loaded fresh before every policy evaluation; the rule set may change
/// between turns.
pub async fn list_active_handoff_rules(db: &Database) -> Result<Vec<HandoffRule>, CrosstalkError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, intent_id, confidence_threshold, is_active FROM handoff_rules
                 WHERE is_active = 1 ORDER BY rowid ASC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(HandoffRule {
                    id: row.get(0)?,
                    intent_id: row.get(1)?,
                    confidence_threshold: row.get(2)?,
                    is_active: row.get(3)?,
                })
            })?;
            let mut rules = Vec::new();
            for row in rows {
                rules.push(row?);
            }
            Ok(rules)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Toggle a handoff rule's active flag.
pub async fn set_rule_active(
    db: &Database,
    id: &str,
    is_active: bool,
) -> Result<(), CrosstalkError> {
    let id_owned = id.to_string();
    let updated = db
        .connection()
        .call(move |conn| {
            let n = conn.execute(
                "UPDATE handoff_rules SET is_active = ?1 WHERE id = ?2",
                params![is_active, id_owned],
            )?;
            Ok(n)
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    if updated == 0 {
        return Err(CrosstalkError::not_found("handoff rule", id));
    }
    Ok(())
}

/// Insert a new auto-reply.
pub async fn insert_auto_reply(db: &Database, reply: &AutoReply) -> Result<(), CrosstalkError> {
    let reply = reply.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO auto_replies
                     (id, channel_id, name, trigger_pattern, response_text, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    reply.id,
                    reply.channel_id,
                    reply.name,
                    reply.trigger_pattern,
                    reply.response_text,
                    reply.is_active,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Active auto-replies for a channel, in insertion order (first match wins).
pub async fn list_active_auto_replies(
    db: &Database,
    channel_id: &str,
) -> Result<Vec<AutoReply>, CrosstalkError> {
    let channel_id = channel_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, channel_id, name, trigger_pattern, response_text, is_active
                 FROM auto_replies WHERE channel_id = ?1 AND is_active = 1
                 ORDER BY rowid ASC",
            )?;
            let rows = stmt.query_map(params![channel_id], |row| {
                Ok(AutoReply {
                    id: row.get(0)?,
                    channel_id: row.get(1)?,
                    name: row.get(2)?,
                    trigger_pattern: row.get(3)?,
                    response_text: row.get(4)?,
                    is_active: row.get(5)?,
                })
            })?;
            let mut replies = Vec::new();
            for row in rows {
                replies.push(row?);
            }
            Ok(replies)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
