//! JSON output

use super::SearchView;
use crate::app::ResponseMode;
use anyhow::Result;
use serde_json::json;

pub fn format_search(view: &SearchView<'_>) -> Result<String> {
    let pack = view.pack;
    let mut value = json!({
        "mode": view.mode.as_str(),
        "seed_count": pack.seeds.len(),
        "file_count": pack.files.len(),
        "segment_count": pack.segment_count(),
        "seeds": pack.seeds,
        "expanded": pack.expanded,
        "files": pack.files,
        "timing": pack.timing,
        "filter": {
            "include": view.filter.paths.include_globs(),
            "exclude": view.filter.paths.exclude_globs(),
        },
    });
    if view.mode == ResponseMode::Raw {
        value["raw_blocks"] = serde_json::to_value(view.raw_blocks)?;
    }
    Ok(serde_json::to_string_pretty(&value)?)
}
