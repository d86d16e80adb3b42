// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyword-based spam scoring for outbound email content.

/// Phrases that raise the spam score, 0.1 each.
const SPAM_KEYWORDS: &[&str] = &[
    "free", "discount", "offer", "limited time", "act now", "click here",
];

/// Score email content in [0.0, 1.0].
///
/// Each keyword occurring in the content (case-insensitive) adds 0.1,
/// capped at 1.0.
pub fn spam_score(content: &str) -> f32 {
    let content_lower = content.to_lowercase();
    let score = SPAM_KEYWORDS
        .iter()
        .filter(|keyword| content_lower.contains(*keyword))
        .count() as f32
        * 0.1;
    score.min(1.0)
}
