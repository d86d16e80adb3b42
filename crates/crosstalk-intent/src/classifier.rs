// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Phrase-similarity intent classifier with atomic model swapping.
//!
//! The trained model is an immutable snapshot held in an [`ArcSwap`] slot:
//! readers load whichever model is current, a retrain builds a whole new
//! model off to the side and swaps it in. Readers never observe a partially
//! rebuilt model.

use arc_swap::ArcSwap;
use std::sync::Arc;
use tracing::{debug, info};

use crosstalk_core::types::{Classification, Intent};
use crosstalk_core::{IntentClassifier, TrainableClassifier};

use crate::vectorizer::{TfidfVectorizer, cosine_similarity};

/// One immutable trained model generation.
struct TrainedModel {
    generation: u64,
    vectorizer: TfidfVectorizer,
    /// TF-IDF vector per training phrase, in fit order.
    phrase_vectors: Vec<Vec<f32>>,
    /// `(intent_id, intent_name)` owning each training phrase, same order.
    phrase_intents: Vec<(String, String)>,
}

impl TrainedModel {
    fn empty() -> Self {
        Self {
            generation: 0,
            vectorizer: TfidfVectorizer::default(),
            phrase_vectors: Vec::new(),
            phrase_intents: Vec::new(),
        }
    }

    fn fit(generation: u64, intents: &[Intent]) -> Self {
        let mut phrases = Vec::new();
        let mut phrase_intents = Vec::new();
        for intent in intents {
            for phrase in &intent.training_phrases {
                phrases.push(phrase.clone());
                phrase_intents.push((intent.id.clone(), intent.name.clone()));
            }
        }

        let vectorizer = TfidfVectorizer::fit(&phrases);
        let phrase_vectors = phrases.iter().map(|p| vectorizer.transform(p)).collect();

        Self {
            generation,
            vectorizer,
            phrase_vectors,
            phrase_intents,
        }
    }

    fn classify(&self, text: &str, min_similarity: f32) -> Classification {
        if self.phrase_vectors.is_empty() {
            return Classification::no_match();
        }

        let query = self.vectorizer.transform(text);

        // Strictly-greater comparison keeps the first-encountered phrase
        // among equal maxima.
        let mut best_index = 0usize;
        let mut best_similarity = f32::MIN;
        for (index, phrase_vector) in self.phrase_vectors.iter().enumerate() {
            let similarity = cosine_similarity(&query, phrase_vector);
            if similarity > best_similarity {
                best_similarity = similarity;
                best_index = index;
            }
        }

        if best_similarity > min_similarity {
            let (intent_id, intent_name) = &self.phrase_intents[best_index];
            return Classification {
                intent_id: Some(intent_id.clone()),
                intent_name: Some(intent_name.clone()),
                confidence: best_similarity,
            };
        }

        Classification::no_match()
    }
}

/// Intent classifier matching input text against training phrases by cosine
/// similarity in a TF-IDF vector space.
///
/// Starts untrained (everything is a no-match) until the first
/// [`retrain`](PhraseClassifier::retrain).
pub struct PhraseClassifier {
    model: ArcSwap<TrainedModel>,
    min_similarity: f32,
}

impl PhraseClassifier {
    /// Create an untrained classifier with the given similarity floor.
    pub fn new(min_similarity: f32) -> Self {
        Self {
            model: ArcSwap::from_pointee(TrainedModel::empty()),
            min_similarity,
        }
    }

    /// Number of training phrases in the current model.
    pub fn phrase_count(&self) -> usize {
        self.model.load().phrase_vectors.len()
    }

    /// Generation counter of the current model (0 = untrained).
    pub fn generation(&self) -> u64 {
        self.model.load().generation
    }
}

impl TrainableClassifier for PhraseClassifier {
    /// Rebuild the model from the given intents and swap it in atomically.
    ///
    /// Not incremental: every retrain refits the full vector space. Readers
    /// see the old model until the swap completes.
    fn retrain(&self, intents: &[Intent]) {
        let generation = self.model.load().generation + 1;
        let model = TrainedModel::fit(generation, intents);
        info!(
            generation = model.generation,
            intents = intents.len(),
            phrases = model.phrase_vectors.len(),
            vocabulary = model.vectorizer.vocabulary_len(),
            "intent model retrained"
        );
        self.model.store(Arc::new(model));
    }
}

impl IntentClassifier for PhraseClassifier {
    fn classify(&self, text: &str) -> Classification {
        let model = self.model.load();
        let classification = model.classify(text, self.min_similarity);
        debug!(
            intent = classification.intent_name.as_deref().unwrap_or("<none>"),
            confidence = classification.confidence,
            "classified input"
        );
        classification
    }
}
