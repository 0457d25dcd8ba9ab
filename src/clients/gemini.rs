//! Google Gemini client.
//!
//! Uses `generateContent` for classification and `embedContent` for embeddings.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{http_client, with_retries, ApiError};
use crate::traits::{
    EmbeddingClient, EmbeddingRequest, EmbeddingResponse, GenerationRequest, GenerationResponse,
    TextGenerationClient,
};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_GENERATION_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

/// Gemini `generateContent` request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerateRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Gemini `generateContent` response.
#[derive(Debug, Deserialize)]
struct GeminiGenerateResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

/// Gemini `embedContent` request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiEmbedRequest {
    model: String,
    content: GeminiContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_dimensionality: Option<u32>,
}

/// Gemini `embedContent` response.
#[derive(Debug, Deserialize)]
struct GeminiEmbedResponse {
    embedding: GeminiEmbedding,
}

#[derive(Debug, Deserialize)]
struct GeminiEmbedding {
    values: Vec<f32>,
}

/// Gemini client implementing both text generation and embeddings.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    generation_model: String,
    embedding_model: String,
    max_retries: u32,
}

impl GeminiClient {
    /// Create a new Gemini client with the given API key and request timeout.
    pub fn new(api_key: String, timeout: Duration) -> crate::Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key,
            base_url: GEMINI_API_BASE.to_string(),
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            max_retries: 0,
        })
    }

    /// Point the client at a different API root (proxies, tests).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_models(mut self, generation_model: &str, embedding_model: &str) -> Self {
        self.generation_model = generation_model.to_string();
        self.embedding_model = embedding_model.to_string();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    async fn post<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: serde::de::DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::from_response("Gemini", response).await.into());
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl TextGenerationClient for GeminiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse> {
        let model = request
            .model
            .unwrap_or_else(|| self.generation_model.clone());
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let body = GeminiGenerateRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: Some(request.prompt),
                }],
            }],
            generation_config: Some(GeminiGenerationConfig {
                temperature: request.temperature,
            }),
        };

        let response: GeminiGenerateResponse =
            with_retries(self.max_retries, "Gemini generateContent", || {
                self.post(&url, &body)
            })
            .await?;

        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .ok_or_else(|| anyhow!("Gemini returned no candidates"))?;

        debug!("Gemini {} returned {} chars", model, text.len());
        Ok(GenerationResponse { text, model })
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn default_model(&self) -> &str {
        &self.generation_model
    }
}

#[async_trait]
impl EmbeddingClient for GeminiClient {
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let model = request
            .model
            .unwrap_or_else(|| self.embedding_model.clone());
        let url = format!("{}/models/{}:embedContent", self.base_url, model);
        let body = GeminiEmbedRequest {
            model: format!("models/{model}"),
            content: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: Some(request.text),
                }],
            },
            task_type: request.task_type,
            output_dimensionality: request.output_dimension,
        };

        let response: GeminiEmbedResponse =
            with_retries(self.max_retries, "Gemini embedContent", || {
                self.post(&url, &body)
            })
            .await?;

        let embedding = response.embedding.values;
        Ok(EmbeddingResponse {
            dimension: embedding.len() as u32,
            embedding,
            model,
        })
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn default_model(&self) -> &str {
        &self.embedding_model
    }
}
