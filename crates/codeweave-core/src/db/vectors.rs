//! Vector storage operations
//!
//! Stores embeddings as BLOBs and computes cosine similarity in Rust.

use super::Database;
use crate::error::Result;
use crate::search::{SearchFilter, VectorChannel, VectorHit};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::params;

impl Database {
    /// Insert or replace the embedding of a chunk
    pub fn insert_chunk_vector(&self, chunk_id: &str, model: &str, embedding: &[f32]) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let embedding_bytes = embedding_to_bytes(embedding);
        self.conn().execute(
            "INSERT OR REPLACE INTO chunk_vectors (chunk_id, model, embedding, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![chunk_id, model, embedding_bytes, now],
        )?;
        Ok(())
    }

    /// Check if vector index exists and has data
    pub fn has_vector_index(&self) -> bool {
        self.conn()
            .query_row("SELECT COUNT(*) FROM chunk_vectors", [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|count| count > 0)
            .unwrap_or(false)
    }

    /// Every chunk id that has an embedding, sorted
    pub fn vector_chunk_ids(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT chunk_id FROM chunk_vectors ORDER BY chunk_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    /// Nearest chunks by cosine distance, filtered by path and language
    pub fn search_vectors(
        &self,
        embedding: &[f32],
        limit: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<VectorHit>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT v.chunk_id, v.embedding, c.file_path, c.language
             FROM chunk_vectors v
             JOIN chunks c ON c.chunk_id = v.chunk_id",
        )?;

        let rows = stmt
            .query_map([], |row| {
                let chunk_id: String = row.get(0)?;
                let bytes: Vec<u8> = row.get(1)?;
                let file_path: String = row.get(2)?;
                let language: String = row.get(3)?;
                Ok((chunk_id, bytes, file_path, language))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut hits: Vec<VectorHit> = rows
            .into_iter()
            .filter(|(_, _, path, language)| filter.allows(path, language))
            .map(|(chunk_id, bytes, _, _)| {
                let similarity = cosine_similarity(embedding, &bytes_to_embedding(&bytes));
                VectorHit {
                    chunk_id,
                    distance: 1.0 - f64::from(similarity),
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.chunk_id.cmp(&b.chunk_id))
        });
        hits.truncate(limit);
        Ok(hits)
    }
}

#[async_trait]
impl VectorChannel for Database {
    async fn search(
        &self,
        embedding: &[f32],
        limit: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<VectorHit>> {
        self.search_vectors(embedding, limit, filter)
    }
}

/// Convert f32 embedding to bytes (little-endian)
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert bytes to f32 embedding
pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_bytes_are_little_endian() {
        let bytes = embedding_to_bytes(&[1.0f32]);
        assert_eq!(bytes, vec![0x00, 0x00, 0x80, 0x3f]);
        assert_eq!(bytes_to_embedding(&bytes), vec![1.0f32]);
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        let sim = cosine_similarity(&a, &b);
        assert!((sim - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        let sim = cosine_similarity(&a, &b);
        assert!(sim.abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_dimension_mismatch() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
    }
}
