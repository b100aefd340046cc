//! Ephemeral TF-IDF vector space.
//!
//! A [`VectorSpace`] is fit on a small corpus (the candidate chunks of one
//! retrieval call) and then used to project both the corpus and the query.
//! Nothing here is persisted or shared between calls; the space is cheap to
//! rebuild and is kept behind this module so it can be replaced by an
//! incremental index without touching ranking.
//!
//! # Weighting
//!
//! - Tokens: lower-cased runs of two or more word characters
//!   (alphanumeric or `_`). Single characters are ignored.
//! - Term frequency: raw count of the token in the text.
//! - Inverse document frequency (smoothed):
//!   `idf(t) = ln((1 + n) / (1 + df(t))) + 1`
//! - Each vector is L2-normalised, so a dot product is a cosine similarity.

use std::collections::{BTreeMap, BTreeSet};

/// Split `text` into lower-cased tokens of at least two word characters.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| t.chars().nth(1).is_some())
        .map(str::to_string)
        .collect()
}

/// Sparse, L2-normalised document vector: `(term index, weight)` pairs
/// sorted by term index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    /// Dot product of two sparse vectors (cosine similarity for unit vectors).
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (a_idx, a_w) = self.entries[i];
            let (b_idx, b_w) = other.entries[j];
            match a_idx.cmp(&b_idx) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += a_w * b_w;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    /// True when no term carries weight (e.g. the text was entirely out of
    /// vocabulary).
    pub fn is_zero(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Vocabulary and IDF weights derived from one corpus.
#[derive(Debug, Clone)]
pub struct VectorSpace {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

impl VectorSpace {
    /// Fit vocabulary and document frequencies on `corpus`.
    pub fn fit<'a, I>(corpus: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut doc_freq: BTreeMap<String, usize> = BTreeMap::new();
        let mut n_docs = 0usize;

        for text in corpus {
            n_docs += 1;
            let unique: BTreeSet<String> = tokenize(text).into_iter().collect();
            for term in unique {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(doc_freq.len());
        for (index, (term, df)) in doc_freq.into_iter().enumerate() {
            let weight = ((1.0 + n_docs as f64) / (1.0 + df as f64)).ln() + 1.0;
            vocabulary.insert(term, index);
            idf.push(weight);
        }

        Self { vocabulary, idf }
    }

    /// Project `text` into this space. Unknown terms contribute nothing.
    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for token in tokenize(text) {
            if let Some(&index) = self.vocabulary.get(&token) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        let mut entries: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(index, tf)| (index, tf * self.idf[index]))
            .collect();

        let norm = entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in &mut entries {
                *w /= norm;
            }
        }

        SparseVector { entries }
    }

    /// Number of distinct terms in the vocabulary.
    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// IDF weight of `term`, if it is in the vocabulary.
    pub fn idf(&self, term: &str) -> Option<f64> {
        self.vocabulary.get(term).map(|&i| self.idf[i])
    }
}
