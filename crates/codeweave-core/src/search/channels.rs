//! Per-channel query text

use serde::{Deserialize, Serialize};

/// Query text routed to each retrieval stage.
///
/// The vector channel sees the natural-language request, the lexical channel
/// leads with exact technical terms, and the reranker sees both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryChannels {
    pub information_request: String,
    pub technical_terms: Vec<String>,
    pub vector_query: String,
    pub lexical_query: String,
    pub rerank_query: String,
}

impl QueryChannels {
    pub fn build(information_request: &str, technical_terms: &[String]) -> Self {
        let request = information_request.trim().to_string();

        let mut terms: Vec<String> = Vec::new();
        for term in technical_terms {
            let term = term.trim();
            if !term.is_empty() && !terms.iter().any(|t| t == term) {
                terms.push(term.to_string());
            }
        }

        let lexical_query = if terms.is_empty() {
            request.clone()
        } else {
            format!("{} {}", terms.join(" "), request).trim().to_string()
        };

        let mut rerank_parts = vec![request.clone()];
        rerank_parts.extend(terms.iter().cloned());
        let rerank_query = rerank_parts
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            vector_query: request.clone(),
            information_request: request,
            technical_terms: terms,
            lexical_query,
            rerank_query,
        }
    }

    /// Same text for every channel
    pub fn single(query: &str) -> Self {
        Self::build(query, &[])
    }

    /// Text recorded in the feedback log
    pub fn feedback_query(&self) -> &str {
        &self.information_request
    }
}
