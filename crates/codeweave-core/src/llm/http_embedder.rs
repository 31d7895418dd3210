//! HTTP embedder for OpenAI-compatible embedding services

use super::Embedder;
use crate::config::ServiceConfig;
use crate::error::{CodeweaveError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_DIMENSIONS: usize = 1024;

/// Embedder that calls an external `/embeddings` endpoint
pub struct HttpEmbedder {
    http_client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
    dimensions: usize,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    /// Create from configuration; fails when no embeddings URL is configured
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let url = config.embeddings_url.clone().ok_or_else(|| {
            CodeweaveError::Config(
                "embeddings URL not configured (set CODEWEAVE_EMBEDDINGS_URL)".to_string(),
            )
        })?;
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            url,
            model: config.embeddings_model.clone(),
            api_key: config.embeddings_api_key.clone(),
            dimensions: config.embeddings_dimensions.unwrap_or(DEFAULT_DIMENSIONS),
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut batch = self.embed_batch(&[text.to_string()]).await?;
        batch
            .pop()
            .ok_or_else(|| CodeweaveError::ExternalError("empty embedding response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };
        let mut req = self.http_client.post(&self.url).json(&request);
        if let Some(ref api_key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CodeweaveError::ExternalError(format!(
                "Embedding service error (HTTP {}): {}",
                status, body
            )));
        }

        let parsed: EmbedResponse = response.json().await?;
        align_embeddings(parsed, texts.len())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn align_embeddings(response: EmbedResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    if response.data.len() != expected {
        return Err(CodeweaveError::ExternalError(format!(
            "Embedding service returned {} vectors for {} inputs",
            response.data.len(),
            expected
        )));
    }
    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for (position, item) in response.data.into_iter().enumerate() {
        let index = item.index.unwrap_or(position);
        match slots.get_mut(index) {
            Some(slot) => *slot = Some(item.embedding),
            None => {
                return Err(CodeweaveError::ExternalError(format!(
                    "Embedding index {} out of range",
                    index
                )))
            }
        }
    }
    slots
        .into_iter()
        .map(|s| {
            s.ok_or_else(|| CodeweaveError::ExternalError("missing embedding".to_string()))
        })
        .collect()
}
