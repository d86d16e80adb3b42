// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daily per-channel metrics rollup.
//!
//! Recomputes one calendar day per pass: message delivery counts,
//! conversations started, conversations completed (last message from the
//! system and idle past the completion window), and the average
//! user-to-system response time derived from conversation message ordering.
//! The result upserts the UNIQUE (channel, date) row.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use crosstalk_core::CrosstalkError;
use crosstalk_core::types::Direction;
use crosstalk_storage::queries::{channels, conversations, messages, metrics};
use crosstalk_storage::{ChannelMetrics, Database};

/// Computes and stores daily channel metrics.
pub struct MetricsRollup {
    db: Arc<Database>,
    /// Idle window after a from-system message before a conversation counts
    /// as completed.
    completion_idle: Duration,
}

impl MetricsRollup {
    /// Create a rollup with the given completion idle window.
    pub fn new(db: Arc<Database>, completion_idle: Duration) -> Self {
        Self { db, completion_idle }
    }

    /// Roll up every active channel for `date`. Returns the number of
    /// channel rows written.
    pub async fn rollup_day(&self, date: NaiveDate) -> Result<usize, CrosstalkError> {
        let start = format!("{date}T00:00:00.000Z");
        let end = format!("{date}T23:59:59.999Z");

        let mut written = 0usize;
        for channel in channels::list_active_channels(&self.db).await? {
            let (sent, delivered, read) =
                messages::count_status_in_window(&self.db, &channel.id, &start, &end).await?;

            let started =
                conversations::list_started_between(&self.db, &channel.id, &start, &end).await?;
            let conversations_started = started.len() as i64;

            let mut conversations_completed = 0i64;
            let mut response_times = Vec::new();
            for conversation in &started {
                if self.is_completed(&conversation.id, &end).await? {
                    conversations_completed += 1;
                }
                self.collect_response_times(&conversation.id, &mut response_times)
                    .await?;
            }

            let average_response_time_secs = if response_times.is_empty() {
                0.0
            } else {
                response_times.iter().sum::<f64>() / response_times.len() as f64
            };

            let row = ChannelMetrics {
                channel_id: channel.id.clone(),
                date: date.to_string(),
                messages_sent: sent,
                messages_delivered: delivered,
                messages_read: read,
                conversations_started,
                conversations_completed,
                average_response_time_secs,
            };
            metrics::upsert_channel_metrics(&self.db, &row).await?;
            written += 1;
        }

        info!(date = %date, channels = written, "daily metrics rolled up");
        Ok(written)
    }

    /// A conversation is completed when its last message is from the system
    /// and predates the completion cutoff.
    async fn is_completed(&self, conversation_id: &str, end: &str) -> Result<bool, CrosstalkError> {
        let Some(last) = conversations::last_message(&self.db, conversation_id).await? else {
            return Ok(false);
        };
        if last.direction != Direction::System {
            return Ok(false);
        }

        let Some(end_time) = parse_timestamp(end) else {
            return Ok(false);
        };
        let Some(last_time) = parse_timestamp(&last.created_at) else {
            warn!(
                conversation_id,
                created_at = last.created_at.as_str(),
                "unparseable message timestamp"
            );
            return Ok(false);
        };

        let cutoff = end_time
            - chrono::TimeDelta::from_std(self.completion_idle)
                .unwrap_or_else(|_| chrono::TimeDelta::hours(4));
        Ok(last_time <= cutoff)
    }

    /// Push the user-to-system response deltas of one conversation, in
    /// seconds. Each from-system message answers the nearest preceding
    /// unanswered from-user message.
    async fn collect_response_times(
        &self,
        conversation_id: &str,
        out: &mut Vec<f64>,
    ) -> Result<(), CrosstalkError> {
        let history = conversations::list_messages(&self.db, conversation_id, None, None).await?;

        let mut pending_user_time: Option<DateTime<Utc>> = None;
        for message in &history {
            let Some(created) = parse_timestamp(&message.created_at) else {
                continue;
            };
            match message.direction {
                Direction::User => pending_user_time = Some(created),
                Direction::System => {
                    if let Some(user_time) = pending_user_time.take() {
                        let delta = (created - user_time).num_milliseconds() as f64 / 1000.0;
                        out.push(delta.max(0.0));
                    }
                }
            }
        }
        Ok(())
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
