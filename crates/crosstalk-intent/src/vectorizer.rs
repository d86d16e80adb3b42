// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TF-IDF term weighting over a fitted phrase corpus.
//!
//! Tokenization lowercases and splits on non-alphanumeric runs. IDF uses the
//! smoothed form `ln((1 + n) / (1 + df)) + 1` and output vectors are
//! l2-normalized, so the dot product of two transformed vectors is their
//! cosine similarity.

use std::collections::HashMap;

/// Split text into lowercase alphanumeric tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

/// Cosine similarity between two equal-length vectors.
///
/// Returns 0.0 when either vector is all zeros.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// A term-weighted vector space fitted over a phrase corpus.
#[derive(Debug, Clone, Default)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f32>,
}

impl TfidfVectorizer {
    /// Fit the vocabulary and IDF weights over `documents`.
    pub fn fit(documents: &[String]) -> Self {
        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        let mut document_frequency: Vec<usize> = Vec::new();

        for doc in documents {
            let mut seen_in_doc: Vec<usize> = Vec::new();
            for token in tokenize(doc) {
                let next_index = vocabulary.len();
                let index = *vocabulary.entry(token).or_insert(next_index);
                if index == document_frequency.len() {
                    document_frequency.push(0);
                }
                if !seen_in_doc.contains(&index) {
                    document_frequency[index] += 1;
                    seen_in_doc.push(index);
                }
            }
        }

        let n_docs = documents.len() as f32;
        let idf = document_frequency
            .iter()
            .map(|&df| ((1.0 + n_docs) / (1.0 + df as f32)).ln() + 1.0)
            .collect();

        Self { vocabulary, idf }
    }

    /// Transform `text` into an l2-normalized TF-IDF vector over the fitted
    /// vocabulary. Out-of-vocabulary tokens are ignored.
    pub fn transform(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.vocabulary.len()];
        for token in tokenize(text) {
            if let Some(&index) = self.vocabulary.get(&token) {
                vector[index] += 1.0;
            }
        }
        for (value, idf) in vector.iter_mut().zip(self.idf.iter()) {
            *value *= idf;
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in vector.iter_mut() {
                *value /= norm;
            }
        }
        vector
    }

    /// Number of distinct terms in the fitted vocabulary.
    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_lowercases_and_splits_punctuation() {
        assert_eq!(
            tokenize("Reset my PASSWORD, please!"),
            vec!["reset", "my", "password", "please"]
        );
        assert!(tokenize("  ...  ").is_empty());
    }

    #[test]
    fn identical_texts_have_unit_similarity() {
        let v = TfidfVectorizer::fit(&["reset password".to_string()]);
        let a = v.transform("reset password");
        let b = v.transform("reset password");
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn disjoint_texts_have_zero_similarity() {
        let v = TfidfVectorizer::fit(&[
            "reset password".to_string(),
            "opening hours".to_string(),
        ]);
        let a = v.transform("reset password");
        let b = v.transform("opening hours");
        assert!(cosine_similarity(&a, &b).abs() < 1e-5);
    }

    #[test]
    fn out_of_vocabulary_query_is_zero_vector() {
        let v = TfidfVectorizer::fit(&["reset password".to_string()]);
        let q = v.transform("completely unrelated words");
        assert!(q.iter().all(|&x| x == 0.0));
        let p = v.transform("reset password");
        assert_eq!(cosine_similarity(&q, &p), 0.0);
    }

    #[test]
    fn superset_query_still_matches_strongly() {
        let v = TfidfVectorizer::fit(&["reset password".to_string()]);
        let phrase = v.transform("reset password");
        let query = v.transform("I need to reset password");
        // The extra tokens are out of vocabulary, so the overlap is total.
        assert!(cosine_similarity(&phrase, &query) > 0.99);
    }

    #[test]
    fn transform_vectors_are_l2_normalized() {
        let v = TfidfVectorizer::fit(&[
            "track my order".to_string(),
            "cancel my order".to_string(),
        ]);
        let t = v.transform("track my order now");
        let norm: f32 = t.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }
}
