//! Client for the Mistral `/embeddings` endpoint.

use super::Embedder;
use crate::config::EmbeddingSettings;
use crate::error::{PulsError, Result};
use crate::openai::{http_client, DEFAULT_TIMEOUT_SECS};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Embedder backed by an OpenAI-compatible `/embeddings` API.
pub struct MistralEmbedder {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    dimensions: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

fn embeddings_endpoint(api_base: &str) -> String {
    let base = api_base.trim_end_matches('/');
    if base.ends_with("/embeddings") {
        base.to_string()
    } else {
        format!("{}/embeddings", base)
    }
}

impl MistralEmbedder {
    /// Create an embedder from settings.
    pub fn new(settings: &EmbeddingSettings, api_key: &str) -> Result<Self> {
        Ok(Self {
            client: http_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
            api_key: api_key.to_string(),
            endpoint: embeddings_endpoint(&settings.api_base),
            model: settings.model.clone(),
            dimensions: settings.dimensions as usize,
        })
    }
}

#[async_trait]
impl Embedder for MistralEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!("POST {} ({} inputs)", self.endpoint, texts.len());

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(PulsError::RateLimited(body));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PulsError::Embedding(format!("HTTP {}: {}", status, body)));
        }

        let mut data = response.json::<EmbeddingResponse>().await?.data;
        data.sort_by_key(|d| d.index);

        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingGenerator, RetryPolicy};
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(server: &MockServer) -> EmbeddingSettings {
        EmbeddingSettings {
            api_base: format!("{}/v1", server.uri()),
            dimensions: 3,
            ..Default::default()
        }
    }

    fn two_vectors() -> serde_json::Value {
        json!({
            "data": [
                {"index": 1, "embedding": [0.0, 1.0, 0.0]},
                {"index": 0, "embedding": [1.0, 0.0, 0.0]}
            ]
        })
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            embeddings_endpoint("https://api.mistral.ai/v1/"),
            "https://api.mistral.ai/v1/embeddings"
        );
        assert_eq!(
            embeddings_endpoint("http://localhost:8080/v1/embeddings"),
            "http://localhost:8080/v1/embeddings"
        );
    }

    #[tokio::test]
    async fn test_response_sorted_by_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(two_vectors()))
            .mount(&server)
            .await;

        let embedder = MistralEmbedder::new(&settings(&server), "secret").unwrap();
        let vectors = embedder
            .embed_batch(&["premier".to_string(), "second".to_string()])
            .await
            .unwrap();

        assert_eq!(vectors, vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]);
    }

    #[tokio::test]
    async fn test_429_is_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Requests rate limit exceeded"))
            .mount(&server)
            .await;

        let embedder = MistralEmbedder::new(&settings(&server), "secret").unwrap();
        let err = embedder.embed_batch(&["x".to_string()]).await.unwrap_err();

        assert!(matches!(err, PulsError::RateLimited(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_not_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let embedder = MistralEmbedder::new(&settings(&server), "bad").unwrap();
        let err = embedder.embed_batch(&["x".to_string()]).await.unwrap_err();

        assert!(matches!(err, PulsError::Embedding(_)));
    }

    #[tokio::test]
    async fn test_generator_recovers_from_single_429() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(two_vectors()))
            .expect(1)
            .mount(&server)
            .await;

        let embedder = Arc::new(MistralEmbedder::new(&settings(&server), "secret").unwrap());
        let generator = EmbeddingGenerator::new(embedder)
            .with_policy(RetryPolicy::default().without_delays());

        let vectors = generator
            .embed(&["premier".to_string(), "second".to_string()])
            .await
            .unwrap();

        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], vec![1.0, 0.0, 0.0]);
    }
}
