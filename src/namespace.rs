//! Per-trial filesystem namespace allocation
//!
//! Each trial owns a disjoint output subtree derived from its identity:
//! raw logs under `<log_root>/<scene>/<variant>/<folder>/<seed>/`, the
//! merged file inside that directory, and the sorted log under
//! `<result_root>/stats_<scene>/<variant>_<folder>_<seed>.json`. The
//! exclusive create on the raw-log directory is the only synchronization
//! the batch needs: two trials can never end up writing into the same
//! subtree.

use std::fs;
use std::io;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::jobs::TrialDescriptor;

/// File name of the merged result set inside a trial's raw-log directory
pub const MERGED_FILE_NAME: &str = "result.json";

/// Output roots shared by the whole batch
#[derive(Debug, Clone)]
pub struct OutputRoots {
    /// Root for raw per-trial planner logs
    pub log_root: PathBuf,
    /// Root for aggregated per-scene results
    pub result_root: PathBuf,
}

/// Allocated output paths for one trial
#[derive(Debug, Clone)]
pub struct TrialPaths {
    /// Freshly created raw-log directory, exclusively owned by the trial
    pub raw_log_dir: PathBuf,
    /// Merged result set, written only when the trial has successes
    pub merged_path: PathBuf,
    /// Sorted robot log in the scene's stats directory
    pub sorted_path: PathBuf,
}

impl TrialPaths {
    /// Allocate the output namespace for a trial
    ///
    /// The raw-log directory is created exclusively: a pre-existing
    /// directory means two trials collided or a previous partial run was
    /// not cleaned up, and silently merging into it would break the
    /// ownership invariant on raw robot results. That case fails loudly
    /// with [`Error::NamespaceCollision`].
    pub fn allocate(roots: &OutputRoots, trial: &TrialDescriptor) -> Result<Self> {
        let raw_log_dir = roots
            .log_root
            .join(&trial.scene)
            .join(&trial.variant.tag)
            .join(&trial.folder)
            .join(trial.seed.to_string());

        if let Some(parent) = raw_log_dir.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        match fs::create_dir(&raw_log_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(Error::NamespaceCollision { path: raw_log_dir });
            }
            Err(e) => return Err(Error::io(&raw_log_dir, e)),
        }

        let stats_dir = roots.result_root.join(format!("stats_{}", trial.scene));
        fs::create_dir_all(&stats_dir).map_err(|e| Error::io(&stats_dir, e))?;
        let sorted_path = stats_dir.join(format!(
            "{}_{}_{}.json",
            trial.variant.tag, trial.folder, trial.seed
        ));

        Ok(TrialPaths {
            merged_path: raw_log_dir.join(MERGED_FILE_NAME),
            raw_log_dir,
            sorted_path,
        })
    }
}
