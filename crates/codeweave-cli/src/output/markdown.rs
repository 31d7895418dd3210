//! Markdown rendering of search results

use super::{code_fence_language, SearchView};
use crate::app::ResponseMode;
use codeweave_core::{PackedFile, RawCodeBlock, ScoredChunk, SearchFilter, Segment};

const FILE_SEPARATOR: &str = "\n\n---\n\n";

pub fn format_search(view: &SearchView<'_>, with_summary: bool) -> String {
    let body = match view.mode {
        ResponseMode::Overview => overview_body(&view.pack.files),
        ResponseMode::Raw => raw_body(&view.pack.seeds, view.raw_blocks, view.raw_top_n),
    };

    let mut header = Vec::new();
    if with_summary {
        header.push(summary_line(view));
    }
    let filters = filter_summary(view.filter);
    if !filters.is_empty() {
        header.push(filters);
    }

    if header.is_empty() {
        body
    } else {
        format!("{}\n\n{}", header.join("\n"), body)
    }
}

pub fn summary_line(view: &SearchView<'_>) -> String {
    format!(
        "Found {} relevant code blocks | Files: {} | Total segments: {} | Mode: {}",
        view.pack.seeds.len(),
        view.pack.files.len(),
        view.pack.segment_count(),
        view.mode.as_str()
    )
}

/// Empty unless at least one path glob is set
pub fn filter_summary(filter: &SearchFilter) -> String {
    let include = filter.paths.include_globs();
    let exclude = filter.paths.exclude_globs();
    if include.is_empty() && exclude.is_empty() {
        return String::new();
    }
    let render = |globs: &[String]| {
        if globs.is_empty() {
            "none".to_string()
        } else {
            globs.join(", ")
        }
    };
    format!(
        "Filter include: {} | exclude: {}",
        render(include),
        render(exclude)
    )
}

fn fenced(path: &str, text: &str) -> String {
    format!(
        "```{}\n{}\n```",
        code_fence_language(path),
        text.trim_end_matches('\n')
    )
}

fn format_segment(segment: &Segment) -> String {
    let mut out = format!(
        "## {} (L{}-{})\n",
        segment.file_path, segment.start_line, segment.end_line
    );
    if !segment.breadcrumb.is_empty() {
        out.push_str(&format!("> {}\n", segment.breadcrumb));
    }
    out.push_str(&fenced(&segment.file_path, &segment.text));
    out
}

fn overview_body(files: &[PackedFile]) -> String {
    files
        .iter()
        .map(|file| {
            file.segments
                .iter()
                .map(format_segment)
                .collect::<Vec<_>>()
                .join("\n\n")
        })
        .collect::<Vec<_>>()
        .join(FILE_SEPARATOR)
}

fn format_raw_block(block: &RawCodeBlock) -> String {
    let mut out = format!(
        "## {} (L{}-{}) score={:.4} source={}\n",
        block.file_path,
        block.start_line,
        block.end_line,
        block.score,
        block.source.as_str()
    );
    if !block.breadcrumb.is_empty() {
        out.push_str(&format!("> {}\n", block.breadcrumb));
    }
    out.push_str(&fenced(&block.file_path, &block.text));
    out
}

fn raw_body(seeds: &[ScoredChunk], blocks: &[RawCodeBlock], top_n: usize) -> String {
    let mut lines = vec!["## Stage 1: Retrieval".to_string()];
    if seeds.is_empty() {
        lines.push("_No seeds_".to_string());
    } else {
        for (i, seed) in seeds.iter().take(top_n).enumerate() {
            lines.push(format!(
                "{}. {}#{} score={:.4} source={}",
                i + 1,
                seed.file_path,
                seed.chunk_index,
                seed.score,
                seed.source.as_str()
            ));
        }
    }

    lines.push(String::new());
    lines.push(format!("## Stage 2: Top {} raw code blocks", top_n));
    if blocks.is_empty() {
        lines.push("_No raw code blocks found._".to_string());
    } else {
        lines.push(
            blocks
                .iter()
                .map(format_raw_block)
                .collect::<Vec<_>>()
                .join(FILE_SEPARATOR),
        );
    }
    lines.join("\n")
}
