// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Intent classification capability traits.

use crate::types::{Classification, Intent};

/// Pluggable intent classification over free text.
///
/// Implementations are infallible by construction: an unavailable or
/// untrained model classifies everything as a no-match with confidence 0.0,
/// so a turn always gets a response regardless of classifier state.
/// Inference is synchronous CPU work over an immutable model snapshot.
pub trait IntentClassifier: Send + Sync {
    /// Classifies `text` into the best-matching intent, or a no-match.
    fn classify(&self, text: &str) -> Classification;
}

/// A classifier whose model can be rebuilt when training phrases change.
///
/// Retrain is not required to be incremental: a full rebuild swapped in
/// atomically is acceptable, and readers mid-rebuild must see either the
/// old or the new model, never a partial one.
pub trait TrainableClassifier: IntentClassifier {
    /// Rebuilds the model from the given intents and their training phrases.
    fn retrain(&self, intents: &[Intent]);
}
