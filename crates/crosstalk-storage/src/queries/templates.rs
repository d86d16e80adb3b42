// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Template CRUD operations.

use crosstalk_core::CrosstalkError;
use rusqlite::params;

use crate::database::Database;
use crate::models::Template;
use crate::queries::json_col;

fn row_to_template(row: &rusqlite::Row<'_>) -> rusqlite::Result<Template> {
    let variables_raw: String = row.get(5)?;
    Ok(Template {
        id: row.get(0)?,
        channel_id: row.get(1)?,
        name: row.get(2)?,
        subject: row.get(3)?,
        content: row.get(4)?,
        variables: json_col(5, &variables_raw)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Insert a new template.
pub async fn insert_template(db: &Database, template: &Template) -> Result<(), CrosstalkError> {
    let template = template.clone();
    let variables_json = serde_json::to_string(&template.variables).map_err(|e| {
        CrosstalkError::Storage {
            source: Box::new(e),
        }
    })?;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO templates
                     (id, channel_id, name, subject, content, variables, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    template.id,
                    template.channel_id,
                    template.name,
                    template.subject,
                    template.content,
                    variables_json,
                    template.created_at,
                    template.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a template by ID.
pub async fn get_template(db: &Database, id: &str) -> Result<Option<Template>, CrosstalkError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT id, channel_id, name, subject, content, variables, created_at, updated_at
                 FROM templates WHERE id = ?1",
                params![id],
                row_to_template,
            );
            match result {
                Ok(template) => Ok(Some(template)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}
