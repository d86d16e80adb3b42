// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response selection for a classified turn.
//!
//! Selection order: a random canned response registered for the detected
//! intent; a fallback naming the intent when none are registered; the
//! generic fallback when no intent was detected at all. A response linked
//! to a knowledge base prefers the value of the first entry whose key
//! occurs in the user's input (case-insensitive substring, insertion order).

use crosstalk_core::CrosstalkError;
use crosstalk_storage::Database;
use crosstalk_storage::queries::intents;
use rand::seq::SliceRandom;
use tracing::warn;

/// A selected response and the registered response row it came from, if any.
#[derive(Debug, Clone)]
pub struct SelectedResponse {
    pub text: String,
    pub response_id: Option<String>,
}

/// Select the response text for a turn that was NOT handed off.
pub async fn select_response(
    db: &Database,
    intent_id: Option<&str>,
    intent_name: Option<&str>,
    user_input: &str,
    generic_fallback: &str,
) -> Result<SelectedResponse, CrosstalkError> {
    let Some(intent_id) = intent_id else {
        return Ok(SelectedResponse {
            text: generic_fallback.to_string(),
            response_id: None,
        });
    };

    let responses = intents::list_responses_for_intent(db, intent_id).await?;
    if responses.is_empty() {
        let name = intent_name.unwrap_or(intent_id);
        return Ok(SelectedResponse {
            text: format!(
                "I understand you're asking about {name}, but I don't have specific information on that yet."
            ),
            response_id: None,
        });
    }

    let response = responses
        .choose(&mut rand::thread_rng())
        .expect("responses is non-empty");

    if let Some(kb_id) = &response.knowledge_base_id {
        match intents::get_knowledge_base(db, kb_id).await? {
            Some(kb) => {
                let input_lower = user_input.to_lowercase();
                for entry in &kb.entries {
                    if input_lower.contains(&entry.key.to_lowercase()) {
                        return Ok(SelectedResponse {
                            text: entry.value.clone(),
                            response_id: Some(response.id.clone()),
                        });
                    }
                }
            }
            None => {
                warn!(
                    knowledge_base_id = kb_id.as_str(),
                    response_id = response.id.as_str(),
                    "response references missing knowledge base"
                );
            }
        }
    }

    Ok(SelectedResponse {
        text: response.text.clone(),
        response_id: Some(response.id.clone()),
    })
}
