//! Budgeted context packing
//!
//! Turns a scored chunk set into per-file, non-overlapping text segments.

mod raw;

pub use raw::{clamp_raw_top_n, collect_raw_blocks, RawCodeBlock, DEFAULT_RAW_TOP_N, MAX_RAW_TOP_N};

use crate::config::SearchConfig;
use crate::error::Result;
use crate::search::{ChunkStore, ScoredChunk};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// A contiguous slice of one file's content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub file_path: String,
    /// Byte offset, inclusive
    pub raw_start: usize,
    /// Byte offset, exclusive
    pub raw_end: usize,
    pub start_line: usize,
    pub end_line: usize,
    /// Breadcrumb of the highest-scoring chunk in the segment
    pub breadcrumb: String,
    pub text: String,
    pub score: f64,
}

impl Segment {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Segments of one file in source order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackedFile {
    pub file_path: String,
    pub segments: Vec<Segment>,
    pub best_score: f64,
}

impl PackedFile {
    pub fn char_len(&self) -> usize {
        self.segments.iter().map(Segment::char_len).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackLimits {
    pub max_segments_per_file: usize,
    pub max_total_chars: usize,
}

impl PackLimits {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            max_segments_per_file: config.max_segments_per_file,
            max_total_chars: config.max_total_chars,
        }
    }
}

/// Packs chunks using file content from a [`ChunkStore`]
pub struct ContextPacker {
    store: Arc<dyn ChunkStore>,
    limits: PackLimits,
}

impl ContextPacker {
    pub fn new(store: Arc<dyn ChunkStore>, limits: PackLimits) -> Self {
        Self { store, limits }
    }

    /// Load every referenced file, then pack. Files that are missing or fail to load are dropped.
    pub async fn pack(&self, chunks: &[ScoredChunk]) -> Vec<PackedFile> {
        let mut paths: Vec<&str> = Vec::new();
        for chunk in chunks {
            if !paths.contains(&chunk.file_path.as_str()) {
                paths.push(&chunk.file_path);
            }
        }

        let loads = paths.iter().map(|p| self.store.file_content(p));
        let results = join_all(loads).await;

        let mut contents = HashMap::new();
        for (path, result) in paths.into_iter().zip(results) {
            match result {
                Ok(Some(content)) => {
                    contents.insert(path.to_string(), content);
                }
                Ok(None) => tracing::warn!(file = %path, "file content missing, dropped from pack"),
                Err(e) => {
                    tracing::warn!(file = %path, error = %e, "file content unreadable, dropped from pack")
                }
            }
        }

        pack_chunks(chunks, &contents, self.limits)
    }
}

/// Span of merged chunks before slicing
struct Span {
    start: usize,
    end: usize,
    score: f64,
    breadcrumb: String,
}

/// Pack `chunks` against already loaded file contents.
///
/// Files are ordered by best chunk score; a file is kept whole or not at all.
pub fn pack_chunks(
    chunks: &[ScoredChunk],
    contents: &HashMap<String, String>,
    limits: PackLimits,
) -> Vec<PackedFile> {
    let mut by_file: Vec<(String, Vec<&ScoredChunk>)> = Vec::new();
    for chunk in chunks {
        match by_file.iter_mut().find(|(path, _)| *path == chunk.file_path) {
            Some((_, group)) => group.push(chunk),
            None => by_file.push((chunk.file_path.clone(), vec![chunk])),
        }
    }

    let mut files: Vec<PackedFile> = by_file
        .into_iter()
        .filter_map(|(path, group)| {
            let content = contents.get(&path)?;
            let file = pack_file(&path, &group, content, limits.max_segments_per_file);
            (!file.segments.is_empty()).then_some(file)
        })
        .collect();

    files.sort_by(|a, b| b.best_score.total_cmp(&a.best_score));

    let mut remaining = limits.max_total_chars;
    let mut packed = Vec::new();
    for file in files {
        let size = file.char_len();
        if size > remaining {
            tracing::debug!(file = %file.file_path, size, remaining, "file exceeds budget");
            continue;
        }
        remaining -= size;
        packed.push(file);
    }
    packed
}

fn pack_file(path: &str, group: &[&ScoredChunk], content: &str, max_segments: usize) -> PackedFile {
    let mut ordered: Vec<&ScoredChunk> = group.to_vec();
    ordered.sort_by_key(|c| (c.record.raw_start, c.record.raw_end));

    let mut spans: Vec<Span> = Vec::new();
    for chunk in ordered {
        let start = floor_boundary(content, chunk.record.raw_start);
        let end = floor_boundary(content, chunk.record.raw_end).max(start);
        match spans.last_mut() {
            Some(last) if start <= last.end => {
                last.end = last.end.max(end);
                if chunk.score > last.score {
                    last.score = chunk.score;
                    last.breadcrumb = chunk.record.breadcrumb.clone();
                }
            }
            _ => spans.push(Span {
                start,
                end,
                score: chunk.score,
                breadcrumb: chunk.record.breadcrumb.clone(),
            }),
        }
    }

    spans.sort_by(|a, b| b.score.total_cmp(&a.score));
    spans.truncate(max_segments);
    spans.sort_by_key(|s| s.start);

    let best_score = spans
        .iter()
        .map(|s| s.score)
        .fold(f64::NEG_INFINITY, f64::max);

    let segments = spans
        .into_iter()
        .filter(|s| s.end > s.start)
        .map(|s| Segment {
            file_path: path.to_string(),
            raw_start: s.start,
            raw_end: s.end,
            start_line: line_at(content, s.start),
            end_line: line_at(content, s.end),
            breadcrumb: s.breadcrumb,
            text: content[s.start..s.end].to_string(),
            score: s.score,
        })
        .collect();

    PackedFile {
        file_path: path.to_string(),
        segments,
        best_score,
    }
}

/// Largest char boundary at or below `offset`, clamped to the content
pub(crate) fn floor_boundary(content: &str, offset: usize) -> usize {
    let mut offset = offset.min(content.len());
    while !content.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// 1-based line number of a byte offset
pub(crate) fn line_at(content: &str, offset: usize) -> usize {
    let offset = floor_boundary(content, offset);
    1 + content.as_bytes()[..offset].iter().filter(|b| **b == b'\n').count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{ChunkRecord, ChunkSource};

    fn chunk(path: &str, index: usize, score: f64, start: usize, end: usize) -> ScoredChunk {
        let record = ChunkRecord {
            chunk_id: format!("{}#h#{}", path, index),
            file_path: path.to_string(),
            chunk_index: index,
            file_hash: "h".to_string(),
            raw_start: start,
            raw_end: end,
            vec_start: start,
            vec_end: end,
            breadcrumb: format!("{} > fn", path),
            language: "typescript".to_string(),
        };
        ScoredChunk::new(record, score, ChunkSource::Vector)
    }

    fn contents(files: &[(&str, &str)]) -> HashMap<String, String> {
        files
            .iter()
            .map(|(p, c)| (p.to_string(), c.to_string()))
            .collect()
    }

    #[test]
    fn test_overlapping_chunks_merge() {
        let files = contents(&[("src/a.ts", "line1\nline2\nline3\nline4\n")]);
        let limits = PackLimits {
            max_segments_per_file: 3,
            max_total_chars: 1000,
        };
        let packed = pack_chunks(
            &[chunk("src/a.ts", 0, 0.9, 0, 11), chunk("src/a.ts", 1, 0.7, 8, 18)],
            &files,
            limits,
        );
        assert_eq!(packed.len(), 1);
        assert_eq!(packed[0].segments.len(), 1);
        let seg = &packed[0].segments[0];
        assert_eq!((seg.raw_start, seg.raw_end), (0, 18));
        assert_eq!((seg.start_line, seg.end_line), (1, 4));
        assert_eq!(seg.score, 0.9);
    }

    #[test]
    fn test_touching_chunks_merge() {
        let files = contents(&[("a.rs", "abcdefghij")]);
        let limits = PackLimits {
            max_segments_per_file: 3,
            max_total_chars: 100,
        };
        let packed = pack_chunks(
            &[chunk("a.rs", 0, 0.5, 0, 4), chunk("a.rs", 1, 0.6, 4, 8)],
            &files,
            limits,
        );
        assert_eq!(packed[0].segments.len(), 1);
        assert_eq!(packed[0].segments[0].text, "abcdefgh");
    }

    #[test]
    fn test_budget_and_segment_limits() {
        let files = contents(&[
            ("src/a.ts", "aaaaaaaaaa\nbbbbbbbbbb\ncccccccccc\n"),
            ("src/b.ts", "xxxxxxxxxx\nyyyyyyyyyy\nzzzzzzzzzz\n"),
        ]);
        let limits = PackLimits {
            max_segments_per_file: 1,
            max_total_chars: 19,
        };
        let packed = pack_chunks(
            &[
                chunk("src/a.ts", 0, 0.95, 0, 10),
                chunk("src/a.ts", 1, 0.8, 11, 21),
                chunk("src/b.ts", 0, 0.7, 0, 10),
            ],
            &files,
            limits,
        );
        assert_eq!(packed.len(), 1);
        assert_eq!(packed[0].file_path, "src/a.ts");
        assert_eq!(packed[0].segments.len(), 1);
        assert_eq!(packed[0].segments[0].text, "aaaaaaaaaa");
    }

    #[test]
    fn test_segments_kept_in_source_order() {
        let files = contents(&[("a.rs", "0123456789abcdefghij")]);
        let limits = PackLimits {
            max_segments_per_file: 2,
            max_total_chars: 100,
        };
        let packed = pack_chunks(
            &[
                chunk("a.rs", 0, 0.1, 0, 3),
                chunk("a.rs", 1, 0.9, 10, 13),
                chunk("a.rs", 2, 0.5, 5, 8),
            ],
            &files,
            limits,
        );
        let starts: Vec<_> = packed[0].segments.iter().map(|s| s.raw_start).collect();
        assert_eq!(starts, vec![5, 10]);
        assert!(packed[0].segments[0].raw_end < packed[0].segments[1].raw_start);
    }

    #[test]
    fn test_offsets_snap_to_char_boundaries() {
        let content = "héllo\nwörld\n";
        assert_eq!(floor_boundary(content, 2), 1);
        assert_eq!(floor_boundary(content, 999), content.len());
        assert_eq!(line_at(content, content.len()), 3);
    }
}
