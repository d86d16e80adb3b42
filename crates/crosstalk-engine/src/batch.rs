// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CSV batch ingestion: bulk-create pending messages from a recipient list.
//!
//! Each row supplies a recipient plus variable bindings for the template.
//! Rows missing the recipient column or failing render are skipped and
//! counted; they never abort the batch. Created messages belong to an
//! email batch row and follow the normal dispatch path (immediate or
//! scheduled).

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crosstalk_core::{CrosstalkError, TemplateRenderer};
use crosstalk_storage::queries::{batches, templates};
use crosstalk_storage::{Database, EmailBatch, now_rfc3339};

use crate::dispatch::{Dispatcher, OutboundRequest};

/// Result counters for one ingested batch.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub batch_id: String,
    pub created: usize,
    pub skipped: usize,
}

/// Ingest a CSV recipient list against a template, creating one pending
/// message per usable row.
///
/// `recipient_column` names the CSV column holding the address (the
/// original feeds use `email`). `scheduled_at` defers dispatch of the whole
/// batch to the scheduled sweep.
#[allow(clippy::too_many_arguments)]
pub async fn ingest_batch<R: std::io::Read>(
    db: &Arc<Database>,
    dispatcher: &Dispatcher,
    renderer: &dyn TemplateRenderer,
    name: &str,
    description: &str,
    template_id: &str,
    recipient_column: &str,
    reader: R,
    scheduled_at: Option<String>,
) -> Result<BatchOutcome, CrosstalkError> {
    let template = templates::get_template(db, template_id)
        .await?
        .ok_or_else(|| CrosstalkError::not_found("template", template_id))?;

    let batch = EmailBatch {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.to_string(),
        description: description.to_string(),
        processed: false,
        created_at: now_rfc3339(),
    };
    batches::insert_batch(db, &batch).await?;

    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader
        .headers()
        .map_err(|e| CrosstalkError::Validation(format!("unreadable CSV header: {e}")))?
        .clone();

    let mut created = 0usize;
    let mut skipped = 0usize;

    for record in csv_reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!(batch_id = batch.id.as_str(), error = %e, "skipping malformed CSV row");
                skipped += 1;
                continue;
            }
        };

        let bindings: HashMap<String, String> = headers
            .iter()
            .zip(record.iter())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let Some(recipient) = bindings.get(recipient_column).filter(|r| !r.trim().is_empty())
        else {
            warn!(
                batch_id = batch.id.as_str(),
                column = recipient_column,
                "skipping row without recipient"
            );
            skipped += 1;
            continue;
        };

        let content = match renderer.render(&template.content, &bindings) {
            Ok(content) => content,
            Err(e) => {
                warn!(batch_id = batch.id.as_str(), error = %e, "render failed, skipping row");
                skipped += 1;
                continue;
            }
        };
        let subject = match &template.subject {
            Some(subject_template) => match renderer.render(subject_template, &bindings) {
                Ok(subject) => Some(subject),
                Err(e) => {
                    warn!(batch_id = batch.id.as_str(), error = %e, "subject render failed, skipping row");
                    skipped += 1;
                    continue;
                }
            },
            None => None,
        };

        let request = OutboundRequest {
            channel_id: template.channel_id.clone(),
            recipient: recipient.clone(),
            content,
            subject,
            template_id: Some(template.id.clone()),
            scheduled_at: scheduled_at.clone(),
            batch_id: Some(batch.id.clone()),
            ..OutboundRequest::default()
        };
        dispatcher.create_outbound(request).await?;
        created += 1;
    }

    batches::mark_batch_processed(db, &batch.id).await?;
    info!(
        batch_id = batch.id.as_str(),
        created,
        skipped,
        "batch ingested"
    );

    Ok(BatchOutcome {
        batch_id: batch.id,
        created,
        skipped,
    })
}
