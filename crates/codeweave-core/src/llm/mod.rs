//! Embedding and rerank service clients

mod http_embedder;
mod http_reranker;
mod traits;

pub use http_embedder::HttpEmbedder;
pub use http_reranker::HttpReranker;
pub use traits::*;
