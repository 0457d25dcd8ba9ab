//! OpenAI-compatible client.
//!
//! Chat completions for classification, `/embeddings` for vectors. Works with any
//! server exposing the same API through [`OpenAIClient::with_base_url`].

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{http_client, with_retries, ApiError};
use crate::traits::{
    EmbeddingClient, EmbeddingRequest, EmbeddingResponse, GenerationRequest, GenerationResponse,
    TextGenerationClient,
};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// OpenAI API embedding request.
#[derive(Debug, Serialize)]
struct OpenAIEmbeddingRequest {
    model: String,
    input: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<u32>,
}

/// OpenAI API embedding response.
#[derive(Debug, Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIEmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI chat completion request.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// OpenAI chat completion response.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// OpenAI client implementing both text generation and embeddings.
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    base_url: String,
    chat_model: String,
    embedding_model: String,
    max_retries: u32,
}

impl OpenAIClient {
    /// Create a new OpenAI client with the given API key and request timeout.
    pub fn new(api_key: String, timeout: Duration) -> crate::Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key,
            base_url: OPENAI_API_BASE.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            max_retries: 0,
        })
    }

    /// Create a new OpenAI client with a custom base URL.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_models(mut self, chat_model: &str, embedding_model: &str) -> Self {
        self.chat_model = chat_model.to_string();
        self.embedding_model = embedding_model.to_string();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: serde::de::DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::from_response("OpenAI", response).await.into());
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl TextGenerationClient for OpenAIClient {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse> {
        let body = ChatRequest {
            model: request.model.unwrap_or_else(|| self.chat_model.clone()),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(request.prompt),
            }],
            temperature: request.temperature,
        };

        let response: ChatResponse =
            with_retries(self.max_retries, "OpenAI chat completion", || {
                self.post("/chat/completions", &body)
            })
            .await?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("No completion returned from OpenAI"))?;

        Ok(GenerationResponse {
            text,
            model: response.model.unwrap_or(body.model),
        })
    }

    fn provider_name(&self) -> &str {
        "openai"
    }

    fn default_model(&self) -> &str {
        &self.chat_model
    }
}

#[async_trait]
impl EmbeddingClient for OpenAIClient {
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let body = OpenAIEmbeddingRequest {
            model: request
                .model
                .unwrap_or_else(|| self.embedding_model.clone()),
            input: vec![request.text],
            dimensions: request.output_dimension,
        };

        let response: OpenAIEmbeddingResponse =
            with_retries(self.max_retries, "OpenAI embeddings", || {
                self.post("/embeddings", &body)
            })
            .await?;

        // Sort by index to ensure correct order
        let mut data = response.data;
        data.sort_by_key(|d| d.index);

        let embedding = data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| anyhow!("No embedding returned from OpenAI"))?;

        Ok(EmbeddingResponse {
            dimension: embedding.len() as u32,
            embedding,
            model: response.model,
        })
    }

    fn provider_name(&self) -> &str {
        "openai"
    }

    fn default_model(&self) -> &str {
        &self.embedding_model
    }
}
