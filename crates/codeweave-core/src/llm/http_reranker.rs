//! HTTP reranker for Cohere-compatible rerank services

use super::{RerankDocument, RerankResult, Reranker};
use crate::config::ServiceConfig;
use crate::error::{CodeweaveError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Reranker that POSTs `{model, query, documents}` and reads `results[].relevance_score`
pub struct HttpReranker {
    http_client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpReranker {
    /// Create from configuration; `None` when no rerank URL is configured
    pub fn from_config(config: &ServiceConfig) -> Result<Option<Self>> {
        let Some(url) = config.rerank_url.clone() else {
            return Ok(None);
        };
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Some(Self {
            http_client,
            url,
            model: config.rerank_model.clone(),
            api_key: config.rerank_api_key.clone(),
        }))
    }
}

#[async_trait]
impl Reranker for HttpReranker {
    async fn rerank(&self, query: &str, documents: &[RerankDocument]) -> Result<Vec<RerankResult>> {
        if documents.is_empty() {
            return Ok(vec![]);
        }

        let texts: Vec<&str> = documents.iter().map(|d| d.text.as_str()).collect();
        let body = serde_json::json!({
            "model": self.model,
            "query": query,
            "documents": texts,
            "return_documents": false,
        });

        let mut req = self.http_client.post(&self.url).json(&body);
        if let Some(ref api_key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CodeweaveError::Rerank(format!("HTTP {}: {}", status, body)));
        }

        let json: Value = response.json().await?;
        let scores = parse_rerank_response(&json, documents.len())?;
        Ok(documents
            .iter()
            .zip(scores)
            .map(|(doc, score)| RerankResult {
                id: doc.id.clone(),
                score,
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn parse_rerank_response(json: &Value, doc_count: usize) -> Result<Vec<f64>> {
    let mut scores = vec![0.0f64; doc_count];
    let results = json
        .get("results")
        .or_else(|| json.get("data"))
        .and_then(|v| v.as_array())
        .ok_or_else(|| CodeweaveError::Rerank("response is missing results array".to_string()))?;

    for item in results {
        let index = item
            .get("index")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| CodeweaveError::Rerank("result missing index".to_string()))?
            as usize;
        let score = item
            .get("relevance_score")
            .or_else(|| item.get("score"))
            .and_then(|v| v.as_f64())
            .ok_or_else(|| CodeweaveError::Rerank("result missing score".to_string()))?;
        if index < scores.len() {
            scores[index] = score;
        }
    }

    Ok(scores)
}
