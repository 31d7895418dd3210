//! Labeled dataset loading (JSON array, `{ "cases": [...] }` or JSONL)

use crate::error::{CodeweaveError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// One labeled query with its final ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkCase {
    pub id: String,
    pub query: String,
    pub retrieved: Vec<String>,
    pub relevant: HashMap<String, f64>,
}

impl BenchmarkCase {
    /// Ids with a positive gain
    pub fn relevant_ids(&self) -> HashSet<String> {
        self.relevant
            .iter()
            .filter(|(_, gain)| gain.is_finite() && **gain > 0.0)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

/// One labeled query with the stored per-channel rankings it was retrieved with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoTuneCase {
    pub id: String,
    pub query: String,
    pub vector_retrieved: Vec<String>,
    pub lexical_retrieved: Vec<String>,
    pub relevant: HashMap<String, f64>,
}

pub fn load_benchmark_dataset(path: impl AsRef<Path>) -> Result<Vec<BenchmarkCase>> {
    let rows = read_rows(path.as_ref())?;
    rows.iter()
        .enumerate()
        .map(|(i, raw)| {
            let row = i + 1;
            let obj = as_object(raw, row)?;
            Ok(BenchmarkCase {
                id: string_field(obj, row, &["id"])?,
                query: string_field(obj, row, &["query"])?,
                retrieved: string_array_field(obj, row, &["retrieved"])?,
                relevant: relevance_field(obj, row)?,
            })
        })
        .collect()
}

pub fn load_auto_tune_dataset(path: impl AsRef<Path>) -> Result<Vec<AutoTuneCase>> {
    let rows = read_rows(path.as_ref())?;
    rows.iter()
        .enumerate()
        .map(|(i, raw)| {
            let row = i + 1;
            let obj = as_object(raw, row)?;
            Ok(AutoTuneCase {
                id: string_field(obj, row, &["id"])?,
                query: string_field(obj, row, &["query"])?,
                vector_retrieved: string_array_field(
                    obj,
                    row,
                    &["vectorRetrieved", "vector_retrieved"],
                )?,
                lexical_retrieved: string_array_field(
                    obj,
                    row,
                    &["lexicalRetrieved", "lexical_retrieved"],
                )?,
                relevant: relevance_field(obj, row)?,
            })
        })
        .collect()
}

fn read_rows(path: &Path) -> Result<Vec<Value>> {
    let content = std::fs::read_to_string(path)?;
    let is_jsonl = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("jsonl"))
        .unwrap_or(false);
    if is_jsonl {
        parse_jsonl(&content)
    } else {
        parse_json(&content)
    }
}

/// Blank lines are skipped; row numbers count non-blank lines
pub fn parse_jsonl(content: &str) -> Result<Vec<Value>> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(i, line)| {
            serde_json::from_str(line)
                .map_err(|e| CodeweaveError::dataset_row(i + 1, format!("invalid JSON: {}", e)))
        })
        .collect()
}

pub fn parse_json(content: &str) -> Result<Vec<Value>> {
    match serde_json::from_str::<Value>(content)? {
        Value::Array(rows) => Ok(rows),
        Value::Object(mut obj) => match obj.remove("cases") {
            Some(Value::Array(rows)) => Ok(rows),
            _ => Err(CodeweaveError::InvalidInput(
                "dataset must be an array or an object with a \"cases\" array".to_string(),
            )),
        },
        _ => Err(CodeweaveError::InvalidInput(
            "dataset must be an array or an object with a \"cases\" array".to_string(),
        )),
    }
}

fn as_object(raw: &Value, row: usize) -> Result<&Map<String, Value>> {
    raw.as_object()
        .ok_or_else(|| CodeweaveError::dataset_row(row, "row must be an object"))
}

fn lookup<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| obj.get(*key))
}

fn string_field(obj: &Map<String, Value>, row: usize, keys: &[&str]) -> Result<String> {
    match lookup(obj, keys).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => Ok(s.to_string()),
        _ => Err(CodeweaveError::dataset_row(
            row,
            format!("field {} must be a non-empty string", keys[0]),
        )),
    }
}

fn string_array_field(obj: &Map<String, Value>, row: usize, keys: &[&str]) -> Result<Vec<String>> {
    let invalid = || {
        CodeweaveError::dataset_row(
            row,
            format!("field {} must be an array of non-empty strings", keys[0]),
        )
    };
    let items = lookup(obj, keys).and_then(Value::as_array).ok_or_else(invalid)?;
    items
        .iter()
        .map(|item| match item.as_str() {
            Some(s) if !s.trim().is_empty() => Ok(s.to_string()),
            _ => Err(invalid()),
        })
        .collect()
}

fn relevance_field(obj: &Map<String, Value>, row: usize) -> Result<HashMap<String, f64>> {
    let map = obj
        .get("relevant")
        .and_then(Value::as_object)
        .ok_or_else(|| CodeweaveError::dataset_row(row, "field relevant must be an object"))?;
    map.iter()
        .map(|(id, gain)| match gain.as_f64() {
            Some(g) if g.is_finite() && g >= 0.0 => Ok((id.clone(), g)),
            _ => Err(CodeweaveError::dataset_row(
                row,
                format!("field relevant.{} must be a non-negative number", id),
            )),
        })
        .collect()
}
