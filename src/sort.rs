//! Temporal sorting
//!
//! Regroups a merged result set by robot name and orders each robot's
//! entries by ascending start time. The output is the terminal per-trial
//! artifact inside a scene's stats directory, keyed by (variant, folder,
//! seed) in the file name.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde_json::Value;

use crate::error::{Error, Result};

fn entry_name(entry: &Value, path: &Path) -> Result<String> {
    entry
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| Error::malformed(path, "entry lacks a string `name` field"))
}

fn entry_start_time(entry: &Value, path: &Path) -> Result<f64> {
    entry
        .get("start_time")
        .and_then(Value::as_f64)
        .ok_or_else(|| Error::malformed(path, "entry lacks a numeric `start_time` field"))
}

/// Sort a merged result set into a per-robot temporal log
///
/// Returns `Ok(None)` without writing anything when `merged_path` does not
/// exist: a trial with zero successes has no merged file, and the missing
/// sorted output is the downstream signal, not an error. Entries missing
/// `name` or `start_time` mean the planner violated its output contract and
/// fail hard with [`Error::MalformedResult`].
///
/// On success returns the number of robots in the log.
pub fn sort_robot_log(merged_path: &Path, sorted_path: &Path) -> Result<Option<usize>> {
    let raw = match fs::read_to_string(merged_path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::io(merged_path, e)),
    };
    let entries: Vec<Value> =
        serde_json::from_str(&raw).map_err(|e| Error::json(merged_path, e))?;

    let mut by_robot: BTreeMap<String, Vec<(f64, Value)>> = BTreeMap::new();
    for entry in entries {
        let name = entry_name(&entry, merged_path)?;
        let start_time = entry_start_time(&entry, merged_path)?;
        by_robot.entry(name).or_default().push((start_time, entry));
    }

    let mut log: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for (name, mut group) in by_robot {
        // stable sort: entries with equal start_time keep their merge order
        group.sort_by(|a, b| a.0.total_cmp(&b.0));
        log.insert(name, group.into_iter().map(|(_, entry)| entry).collect());
    }

    let robots = log.len();
    let body = serde_json::to_string_pretty(&log).map_err(|e| Error::json(sorted_path, e))?;
    fs::write(sorted_path, body).map_err(|e| Error::io(sorted_path, e))?;
    Ok(Some(robots))
}
