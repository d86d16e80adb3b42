// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Intent classification for the Crosstalk messaging engine.
//!
//! This crate provides:
//! - [`TfidfVectorizer`]: term-weighted vector space over training phrases
//! - [`PhraseClassifier`]: cosine-similarity matcher implementing the
//!   `IntentClassifier` capability, with atomic model swaps on retrain
//!
//! Classification is shared read-mostly state: the trained model is rebuilt
//! wholesale on retrain and swapped into an `ArcSwap` slot, so inference
//! never blocks on training and never sees a half-built model.

pub mod classifier;
pub mod vectorizer;

pub use classifier::PhraseClassifier;
pub use vectorizer::{TfidfVectorizer, cosine_similarity, tokenize};
