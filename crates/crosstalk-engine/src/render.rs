// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reference template renderer: `{{ var }}` substitution.
//!
//! The strict counterpart to a full template engine: every placeholder must
//! resolve, and an unresolved variable is a `RenderError` that aborts the
//! message being composed.

use std::collections::HashMap;

use crosstalk_core::{CrosstalkError, TemplateRenderer};
use regex::Regex;

/// Substitutes `{{ var }}` placeholders from a binding map.
pub struct VarRenderer {
    placeholder: Regex,
}

impl VarRenderer {
    /// Create a renderer.
    pub fn new() -> Self {
        Self {
            // Unwrap is safe: the pattern is a compile-time constant.
            placeholder: Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("valid regex"),
        }
    }
}

impl Default for VarRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer for VarRenderer {
    fn render(
        &self,
        template: &str,
        bindings: &HashMap<String, String>,
    ) -> Result<String, CrosstalkError> {
        // Verify every referenced variable resolves before substituting.
        for capture in self.placeholder.captures_iter(template) {
            let name = &capture[1];
            if !bindings.contains_key(name) {
                return Err(CrosstalkError::Render {
                    message: format!("unresolved template variable `{name}`"),
                });
            }
        }

        let rendered = self
            .placeholder
            .replace_all(template, |caps: &regex::Captures<'_>| {
                bindings[&caps[1]].clone()
            });
        Ok(rendered.into_owned())
    }
}
