// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Template rendering capability trait.

use std::collections::HashMap;

use crate::error::CrosstalkError;

/// Renders outbound content from a template and variable bindings.
///
/// A failed variable resolution is a [`CrosstalkError::Render`], which aborts
/// the creation of the message being composed (and only that message).
pub trait TemplateRenderer: Send + Sync {
    /// Substitutes `bindings` into `template`, returning the rendered text.
    fn render(
        &self,
        template: &str,
        bindings: &HashMap<String, String>,
    ) -> Result<String, CrosstalkError>;
}
