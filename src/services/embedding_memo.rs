//! In-run memo of embeddings keyed by model and text.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

/// Remembers vectors already fetched during this run.
#[derive(Debug, Default)]
pub struct EmbeddingMemo {
    entries: HashMap<String, Vec<f32>>,
    hits: usize,
}

impl EmbeddingMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a memo key from text and model.
    pub fn generate_key(text: &str, model: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("{}:{}", model, text));
        format!("{:x}", hasher.finalize())
    }

    pub fn get(&mut self, key: &str) -> Option<Vec<f32>> {
        let found = self.entries.get(key).cloned();
        if found.is_some() {
            self.hits += 1;
        }
        found
    }

    pub fn insert(&mut self, key: String, value: Vec<f32>) {
        self.entries.insert(key, value);
    }

    /// (entries, hits)
    pub fn stats(&self) -> (usize, usize) {
        (self.entries.len(), self.hits)
    }
}
