//! Result merging
//!
//! The planner writes one JSON document per robot into the trial's raw-log
//! directory. Merging concatenates the documents whose `success` flag is
//! truthy into a single JSON array. Input files are visited in lexicographic
//! file-name order, so a re-run over an unchanged directory reproduces the
//! merged file byte for byte on any platform.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{Error, Result};

/// Success flag of a raw robot result, `None` when the document does not
/// carry one. The wire contract says `0|1`; booleans are accepted too.
fn success_flag(doc: &Value) -> Option<bool> {
    match doc.get("success")? {
        Value::Bool(flag) => Some(*flag),
        Value::Number(n) => n.as_f64().map(|v| v != 0.0),
        _ => None,
    }
}

fn read_document(path: &Path) -> std::result::Result<Value, String> {
    let raw = fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&raw).map_err(|e| e.to_string())
}

/// Merge a trial's raw robot results into `merged_path`
///
/// Reads every `*.json` file in `raw_dir` except a previous merge output,
/// keeps the documents whose `success` flag is truthy, and writes them as a
/// JSON array. A file that cannot be parsed, or that lacks a `success`
/// flag, is logged and skipped; one corrupt or partial write never poisons
/// the rest of the trial. When the filtered sequence is empty nothing is
/// written at all: the absent merged file is the downstream signal for a
/// fully failed trial.
///
/// Returns the number of merged documents.
pub fn merge_robot_results(raw_dir: &Path, merged_path: &Path) -> Result<usize> {
    let mut files: Vec<PathBuf> = Vec::new();
    let entries = fs::read_dir(raw_dir).map_err(|e| Error::io(raw_dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(raw_dir, e))?;
        let path = entry.path();
        if path == merged_path {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let file_type = entry.file_type().map_err(|e| Error::io(&path, e))?;
        if file_type.is_file() {
            files.push(path);
        }
    }
    // native listing order is platform-defined
    files.sort();

    let mut merged: Vec<Value> = Vec::new();
    for path in &files {
        let doc = match read_document(path) {
            Ok(doc) => doc,
            Err(reason) => {
                tracing::warn!(
                    path = %path.display(),
                    %reason,
                    "skipping unreadable raw result"
                );
                continue;
            }
        };
        match success_flag(&doc) {
            Some(true) => merged.push(doc),
            Some(false) => {}
            None => {
                tracing::warn!(
                    path = %path.display(),
                    "skipping raw result without a success flag"
                );
            }
        }
    }

    if merged.is_empty() {
        return Ok(0);
    }

    let body = serde_json::to_string_pretty(&merged).map_err(|e| Error::json(merged_path, e))?;
    fs::write(merged_path, body).map_err(|e| Error::io(merged_path, e))?;
    Ok(merged.len())
}
