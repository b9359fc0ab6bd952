//! Deterministic feature-hashing embeddings
//!
//! Text is split into lowercase words (on non-alphanumerics and camelCase
//! humps), and each word contributes itself plus its boundary-marked character
//! trigrams to a signed hashed bag of features. The result is L2-normalized.
//! Lexical overlap, including shared stems like `refresh`/`refreshing`, maps
//! to cosine similarity. No model, no network, identical output on every
//! platform.

use crate::embedding::traits::EmbeddingProvider;
use crate::EmbeddingResult;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

const WORD_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

/// Embedding provider that needs no model download
#[derive(Debug, Clone)]
pub struct HashingEmbeddingProvider {
    dimension: usize,
    name: String,
}

impl HashingEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            name: format!("feature-hashing-{dimension}"),
        }
    }

    /// Embed one text
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for word in split_words(text) {
            self.add_feature(&mut vector, word.as_bytes(), WORD_WEIGHT);

            let marked: Vec<char> = std::iter::once('^')
                .chain(word.chars())
                .chain(std::iter::once('$'))
                .collect();
            for trigram in marked.windows(3) {
                let gram: String = trigram.iter().collect();
                self.add_feature(&mut vector, gram.as_bytes(), TRIGRAM_WEIGHT);
            }
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }

    fn add_feature(&self, vector: &mut [f32], feature: &[u8], weight: f32) {
        let hash = feature_hash(feature);
        let bucket = hash % self.dimension as u64;
        let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
        if let Ok(index) = usize::try_from(bucket)
            && let Some(slot) = vector.get_mut(index)
        {
            *slot += sign * weight;
        }
    }
}

/// Leading 64 bits of the feature's SHA-256 digest
fn feature_hash(bytes: &[u8]) -> u64 {
    let digest = Sha256::digest(bytes);
    digest
        .as_slice()
        .first_chunk::<8>()
        .map_or(0, |prefix| u64::from_be_bytes(*prefix))
}

/// Lowercase words split on non-alphanumerics and lower→upper case changes
fn split_words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for ch in text.chars() {
        if !ch.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_numeric();
        current.extend(ch.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    async fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn max_tokens(&self) -> usize {
        usize::MAX
    }

    fn model_name(&self) -> &str {
        &self.name
    }

    async fn is_ready(&self) -> bool {
        true
    }

    async fn ensure_ready(&self) -> EmbeddingResult<()> {
        Ok(())
    }
}
