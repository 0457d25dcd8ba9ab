//! Core traits for the remote model clients.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Request for generating an embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// The text to embed.
    pub text: String,
    /// The model to use (provider-specific).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Optional output dimension (for models that support it).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dimension: Option<u32>,
    /// Task type hint (e.g., "CLUSTERING").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
}

/// Response containing the generated embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// The embedding vector.
    pub embedding: Vec<f32>,
    /// The dimension of the embedding.
    pub dimension: u32,
    /// The model used to generate the embedding.
    pub model: String,
}

/// Request for a single-turn text generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The full instruction sent as the user turn.
    pub prompt: String,
    /// The model to use (provider-specific).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Sampling temperature; the classifier always sends 0.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Generated text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Concatenated text of the first candidate.
    pub text: String,
    /// The model that produced it.
    pub model: String,
}

/// Trait for clients that turn text into embedding vectors.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse>;

    /// Get the provider name.
    fn provider_name(&self) -> &str;

    /// Get the default embedding model for this provider.
    fn default_model(&self) -> &str;
}

/// Trait for instruction-following text generation clients.
#[async_trait]
pub trait TextGenerationClient: Send + Sync {
    /// Generate a completion for a single prompt.
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse>;

    /// Get the provider name.
    fn provider_name(&self) -> &str;

    /// Get the default generation model for this provider.
    fn default_model(&self) -> &str;
}
