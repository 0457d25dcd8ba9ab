//! Remote model clients.

pub mod gemini;
pub mod openai;

pub use gemini::GeminiClient;
pub use openai::OpenAIClient;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::warn;

use crate::config::{Config, Provider};
use crate::error::{Error, Result};
use crate::traits::{EmbeddingClient, TextGenerationClient};

const INITIAL_BACKOFF: Duration = Duration::from_millis(250);

/// Non-success HTTP response from a provider.
#[derive(Debug, thiserror::Error)]
#[error("{provider} API error ({status}): {body}")]
pub struct ApiError {
    pub provider: &'static str,
    pub status: StatusCode,
    pub body: String,
}

impl ApiError {
    /// Rate limits and server-side failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        self.status == StatusCode::TOO_MANY_REQUESTS
            || self.status == StatusCode::REQUEST_TIMEOUT
            || self.status.is_server_error()
    }

    pub(crate) async fn from_response(provider: &'static str, response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Self {
            provider,
            status,
            body,
        }
    }
}

fn is_retryable(err: &anyhow::Error) -> bool {
    if let Some(api) = err.downcast_ref::<ApiError>() {
        return api.is_retryable();
    }
    if let Some(http) = err.downcast_ref::<reqwest::Error>() {
        return http.is_timeout() || http.is_connect();
    }
    false
}

/// Run `op`, retrying retryable failures with exponential backoff.
pub(crate) async fn with_retries<T, F, Fut>(
    max_retries: u32,
    what: &str,
    mut op: F,
) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let mut attempt = 0;
    let mut delay = INITIAL_BACKOFF;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_retries && is_retryable(&err) => {
                attempt += 1;
                warn!(
                    "{} failed (attempt {}/{}), retrying in {:?}: {:#}",
                    what,
                    attempt,
                    max_retries + 1,
                    delay,
                    err
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(err) => return Err(err),
        }
    }
}

pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Configuration(format!("failed to create HTTP client: {e}")))
}

/// Build the text-generation and embedding clients for the configured provider.
pub fn build_clients(
    config: &Config,
) -> Result<(Arc<dyn TextGenerationClient>, Arc<dyn EmbeddingClient>)> {
    config.validate()?;
    let api_key = config.api_key.clone().unwrap_or_default();
    let timeout = Duration::from_secs(config.timeout_seconds);

    match config.provider {
        Provider::Gemini => {
            let mut client = GeminiClient::new(api_key, timeout)?
                .with_models(&config.classifier_model, &config.embedding_model)
                .with_max_retries(config.max_retries);
            if let Some(base) = &config.api_base {
                client = client.with_base_url(base);
            }
            let client = Arc::new(client);
            let generator: Arc<dyn TextGenerationClient> = client.clone();
            let embedder: Arc<dyn EmbeddingClient> = client;
            Ok((generator, embedder))
        }
        Provider::OpenAi => {
            let mut client = OpenAIClient::new(api_key, timeout)?
                .with_models(&config.classifier_model, &config.embedding_model)
                .with_max_retries(config.max_retries);
            if let Some(base) = &config.api_base {
                client = client.with_base_url(base);
            }
            let client = Arc::new(client);
            let generator: Arc<dyn TextGenerationClient> = client.clone();
            let embedder: Arc<dyn EmbeddingClient> = client;
            Ok((generator, embedder))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn api_error(status: u16) -> anyhow::Error {
        ApiError {
            provider: "test",
            status: StatusCode::from_u16(status).unwrap(),
            body: String::new(),
        }
        .into()
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable(&api_error(429)));
        assert!(is_retryable(&api_error(503)));
        assert!(!is_retryable(&api_error(400)));
        assert!(!is_retryable(&api_error(401)));
        assert!(!is_retryable(&anyhow::anyhow!("malformed body")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let result = with_retries(3, "test call", || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(api_error(503))
            } else {
                Ok(7)
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_on_permanent_error() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let result: anyhow::Result<()> = with_retries(3, "test call", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(api_error(401))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_build_clients_requires_key() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert!(matches!(build_clients(&config), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_build_clients_for_each_provider() {
        let gemini = Config::from_lookup(|k| (k == "GOOGLE_API_KEY").then(|| "k".to_string()))
            .unwrap();
        let (generator, embedder) = build_clients(&gemini).unwrap();
        assert_eq!(generator.provider_name(), "gemini");
        assert_eq!(embedder.default_model(), "text-embedding-004");

        let openai = Config::from_lookup(|k| match k {
            "LLM_PROVIDER" => Some("openai".to_string()),
            "OPENAI_API_KEY" => Some("sk".to_string()),
            _ => None,
        })
        .unwrap();
        let (generator, _) = build_clients(&openai).unwrap();
        assert_eq!(generator.provider_name(), "openai");
        assert_eq!(generator.default_model(), "gpt-4o-mini");
    }
}
