//! Raw code blocks for the two-stage response mode

use super::{floor_boundary, line_at};
use crate::error::Result;
use crate::search::{ChunkRecord, ChunkSource, ChunkStore, ScoredChunk};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_RAW_TOP_N: usize = 5;
pub const MAX_RAW_TOP_N: usize = 20;

/// Whole definition text around one seed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCodeBlock {
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub breadcrumb: String,
    pub text: String,
    pub score: f64,
    pub source: ChunkSource,
}

pub fn clamp_raw_top_n(top_n: Option<usize>) -> usize {
    top_n.unwrap_or(DEFAULT_RAW_TOP_N).clamp(1, MAX_RAW_TOP_N)
}

/// Collect up to `top_n` raw blocks, one per `(file, breadcrumb)`.
///
/// Each seed's span widens to the contiguous run of chunks sharing its breadcrumb.
pub async fn collect_raw_blocks(
    seeds: &[ScoredChunk],
    top_n: usize,
    store: &dyn ChunkStore,
) -> Result<Vec<RawCodeBlock>> {
    let mut blocks = Vec::new();
    if seeds.is_empty() || top_n == 0 {
        return Ok(blocks);
    }

    let mut seen_seeds: HashSet<(&str, &str)> = HashSet::new();
    let mut seen_ranges: HashSet<(String, usize, usize)> = HashSet::new();

    for seed in seeds {
        if blocks.len() >= top_n {
            break;
        }
        if !seen_seeds.insert((seed.file_path.as_str(), seed.record.breadcrumb.as_str())) {
            continue;
        }

        let Some(content) = store.file_content(&seed.file_path).await? else {
            continue;
        };
        let listing = store.file_chunks(&seed.file_path).await?;
        let (start, end) = raw_range(seed, &listing, &content);
        let text = &content[start..end];
        if text.trim().is_empty() {
            continue;
        }
        if !seen_ranges.insert((seed.file_path.clone(), start, end)) {
            continue;
        }

        blocks.push(RawCodeBlock {
            file_path: seed.file_path.clone(),
            start_line: line_at(&content, start),
            end_line: line_at(&content, end),
            breadcrumb: seed.record.breadcrumb.clone(),
            text: text.to_string(),
            score: seed.score,
            source: seed.source,
        });
    }

    Ok(blocks)
}

fn raw_range(seed: &ScoredChunk, listing: &[ChunkRecord], content: &str) -> (usize, usize) {
    let own = (seed.record.raw_start, seed.record.raw_end);
    let breadcrumb = &seed.record.breadcrumb;

    let (start, end) = match listing.iter().position(|c| c.chunk_index == seed.chunk_index) {
        Some(idx) if !breadcrumb.is_empty() => {
            let mut left = idx;
            while left > 0 && &listing[left - 1].breadcrumb == breadcrumb {
                left -= 1;
            }
            let mut right = idx;
            while right + 1 < listing.len() && &listing[right + 1].breadcrumb == breadcrumb {
                right += 1;
            }
            let group = &listing[left..=right];
            let start = group.iter().map(|c| c.raw_start).min().unwrap_or(own.0);
            let end = group.iter().map(|c| c.raw_end).max().unwrap_or(own.1);
            (start, end)
        }
        _ => own,
    };

    let start = floor_boundary(content, start);
    let end = floor_boundary(content, end).max(start);
    (start, end)
}
