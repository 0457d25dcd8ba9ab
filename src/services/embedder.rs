//! Embedding of tag strings through a remote embedding model.

use std::sync::Arc;

use tracing::{debug, warn};

use super::embedding_memo::EmbeddingMemo;
use super::vector_ops::VectorOps;
use crate::error::Error;
use crate::traits::{EmbeddingClient, EmbeddingRequest};

const CLUSTERING_TASK: &str = "CLUSTERING";

/// Wraps an [`EmbeddingClient`], validating vectors and memoising repeats.
pub struct Embedder {
    client: Arc<dyn EmbeddingClient>,
    model: Option<String>,
    expected_dimension: Option<u32>,
    memo: EmbeddingMemo,
}

impl Embedder {
    pub fn new(client: Arc<dyn EmbeddingClient>) -> Self {
        Self {
            client,
            model: None,
            expected_dimension: None,
            memo: EmbeddingMemo::new(),
        }
    }

    /// Override the client's default model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Reject vectors of any other length.
    pub fn with_expected_dimension(mut self, dimension: Option<u32>) -> Self {
        self.expected_dimension = dimension;
        self
    }

    /// Embed `text`, or `None` when the remote call fails or returns an unusable vector.
    pub async fn embed(&mut self, text: &str) -> Option<Vec<f32>> {
        let model = self
            .model
            .clone()
            .unwrap_or_else(|| self.client.default_model().to_string());
        let key = EmbeddingMemo::generate_key(text, &model);
        if let Some(vector) = self.memo.get(&key) {
            debug!("Reusing embedding for \"{}\"", preview(text));
            return Some(vector);
        }

        debug!("Embedding \"{}\"", preview(text));
        let request = EmbeddingRequest {
            text: text.to_string(),
            model: self.model.clone(),
            output_dimension: self.expected_dimension,
            task_type: Some(CLUSTERING_TASK.to_string()),
        };

        let vector = match self.client.embed(request).await {
            Ok(response) => response.embedding,
            Err(e) => {
                warn!("{}", Error::Embedding(format!("\"{}\": {e:#}", preview(text))));
                return None;
            }
        };

        if let Err(reason) = self.check(&vector) {
            warn!("{}", Error::Embedding(format!("\"{}\": {reason}", preview(text))));
            return None;
        }

        self.memo.insert(key, vector.clone());
        Some(vector)
    }

    fn check(&self, vector: &[f32]) -> Result<(), String> {
        if vector.is_empty() {
            return Err("empty vector".to_string());
        }
        if !VectorOps::is_finite(vector) {
            return Err("vector contains non-finite values".to_string());
        }
        match self.expected_dimension {
            Some(expected) if vector.len() != expected as usize => Err(format!(
                "expected {} dimensions, got {}",
                expected,
                vector.len()
            )),
            _ => Ok(()),
        }
    }

    /// (memoised vectors, memo hits)
    pub fn memo_stats(&self) -> (usize, usize) {
        self.memo.stats()
    }
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(20).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::EmbeddingResponse;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedEmbedder {
        vector: Option<Vec<f32>>,
        calls: AtomicUsize,
    }

    impl FixedEmbedder {
        fn returning(vector: Option<Vec<f32>>) -> Arc<Self> {
            Arc::new(Self {
                vector,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl EmbeddingClient for FixedEmbedder {
        async fn embed(&self, request: EmbeddingRequest) -> anyhow::Result<EmbeddingResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(request.task_type.as_deref(), Some("CLUSTERING"));
            let embedding = self.vector.clone().ok_or_else(|| anyhow!("503 unavailable"))?;
            Ok(EmbeddingResponse {
                dimension: embedding.len() as u32,
                embedding,
                model: "fixed".to_string(),
            })
        }

        fn provider_name(&self) -> &str {
            "fixed"
        }

        fn default_model(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_embed_success_and_memo() {
        let client = FixedEmbedder::returning(Some(vec![0.5, 0.5]));
        let mut embedder = Embedder::new(client.clone());

        assert_eq!(embedder.embed("video,streaming").await, Some(vec![0.5, 0.5]));
        assert_eq!(embedder.embed("video,streaming").await, Some(vec![0.5, 0.5]));
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
        assert_eq!(embedder.memo_stats(), (1, 1));
    }

    #[tokio::test]
    async fn test_remote_failure_is_absence() {
        let client = FixedEmbedder::returning(None);
        let mut embedder = Embedder::new(client.clone());
        assert_eq!(embedder.embed("video").await, None);
        // Failures are not memoised.
        assert_eq!(embedder.embed("video").await, None);
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unusable_vectors_rejected() {
        let mut embedder = Embedder::new(FixedEmbedder::returning(Some(vec![])));
        assert_eq!(embedder.embed("video").await, None);

        let mut embedder = Embedder::new(FixedEmbedder::returning(Some(vec![f32::NAN, 1.0])));
        assert_eq!(embedder.embed("video").await, None);

        let mut embedder = Embedder::new(FixedEmbedder::returning(Some(vec![1.0, 0.0])))
            .with_expected_dimension(Some(768));
        assert_eq!(embedder.embed("video").await, None);
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        assert_eq!(preview("short"), "short");
        let long = "开放世界,角色扮演,动作游戏,二次元,多人联机";
        assert!(preview(long).ends_with("..."));
        assert_eq!(preview(long).chars().count(), 23);
    }
}
