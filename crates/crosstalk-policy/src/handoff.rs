// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handoff escalation decision.
//!
//! A pure function of (detected intent, confidence, active rule set). The
//! rule set is passed in freshly loaded per call; rules may change between
//! turns and the decision must never cache them.

use crosstalk_core::types::HandoffRule;
use tracing::debug;

/// Evaluates whether a turn must be escalated to a human agent.
#[derive(Debug, Clone)]
pub struct HandoffPolicy {
    /// Global confidence floor. Below it every turn hands off, before any
    /// per-rule threshold is consulted.
    floor: f32,
}

impl HandoffPolicy {
    /// Create a policy with the given global floor.
    pub fn new(floor: f32) -> Self {
        Self { floor }
    }

    /// The configured global floor.
    pub fn floor(&self) -> f32 {
        self.floor
    }

    /// Decide handoff for a classified turn.
    ///
    /// 1. No intent, or confidence under the global floor: handoff.
    /// 2. Otherwise any active rule fires when confidence is under its
    ///    threshold, either scoped to this intent or general (no scope).
    ///    OR semantics: one firing rule is enough.
    pub fn should_handoff(
        &self,
        intent_id: Option<&str>,
        confidence: f32,
        rules: &[HandoffRule],
    ) -> bool {
        let Some(intent_id) = intent_id else {
            debug!("handoff: no intent detected");
            return true;
        };
        if confidence < self.floor {
            debug!(confidence, floor = self.floor, "handoff: confidence under global floor");
            return true;
        }

        for rule in rules {
            if !rule.is_active {
                continue;
            }
            let applies = match &rule.intent_id {
                Some(scoped) => scoped == intent_id,
                None => true,
            };
            if applies && confidence < rule.confidence_threshold {
                debug!(
                    rule = rule.id.as_str(),
                    confidence,
                    threshold = rule.confidence_threshold,
                    "handoff: rule fired"
                );
                return true;
            }
        }

        false
    }
}
