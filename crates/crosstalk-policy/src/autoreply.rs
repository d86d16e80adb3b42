// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Auto-reply trigger matching.
//!
//! Auto-replies fire on a case-insensitive substring match of their trigger
//! pattern against inbound content, independent of intent classification.
//! The first matching active rule (insertion order) wins.

use crosstalk_core::types::AutoReply;

/// Find the first active auto-reply whose trigger pattern occurs in
/// `content`, case-insensitively.
pub fn match_auto_reply<'a>(replies: &'a [AutoReply], content: &str) -> Option<&'a AutoReply> {
    let content_lower = content.to_lowercase();
    replies
        .iter()
        .filter(|r| r.is_active)
        .find(|r| content_lower.contains(&r.trigger_pattern.to_lowercase()))
}
