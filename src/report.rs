//! Batch completion reporting
//!
//! The report is the operator's view of a finished batch: which trials
//! completed, which failed at submission or collection, which were
//! cancelled by shutdown, and per scene how many finished trials produced
//! no sorted output. That last count separates "the planner found no
//! solution" from an infrastructure fault.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::runner::TrialReport;

/// One trial that failed before or during collection
#[derive(Debug, Clone, Serialize)]
pub struct FailedTrial {
    /// Trial identity, `scene/variant/folder/seed`
    pub id: String,
    /// Failure description
    pub error: String,
}

/// Aggregate outcome of a whole batch
#[derive(Debug, Serialize)]
pub struct BatchReport {
    /// Number of enumerated trials
    pub total: usize,
    /// Worker pool size the batch ran with
    pub workers: usize,
    /// When the batch started
    pub started_at: DateTime<Utc>,
    /// When the batch finished
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Wall-clock duration in seconds
    pub elapsed_secs: f64,
    /// Trials that ran to completion (including planner-failed ones)
    pub completed: Vec<TrialReport>,
    /// Trials that failed at submission or collection
    pub failed: Vec<FailedTrial>,
    /// Trials cancelled by shutdown before starting
    pub cancelled: Vec<String>,
    /// Per scene, completed trials that produced no sorted output
    pub no_solution_by_scene: BTreeMap<String, usize>,
}

impl BatchReport {
    /// Create an empty report for a batch of `total` trials
    pub fn new(total: usize, workers: usize) -> Self {
        Self {
            total,
            workers,
            started_at: Utc::now(),
            finished_at: None,
            elapsed_secs: 0.0,
            completed: Vec::new(),
            failed: Vec::new(),
            cancelled: Vec::new(),
            no_solution_by_scene: BTreeMap::new(),
        }
    }

    /// Record a trial that ran to completion
    pub fn record_completed(&mut self, report: TrialReport) {
        if !report.sorted {
            *self
                .no_solution_by_scene
                .entry(report.scene.clone())
                .or_default() += 1;
        }
        self.completed.push(report);
    }

    /// Record a trial that failed
    pub fn record_failed(&mut self, id: String, error: String) {
        self.failed.push(FailedTrial { id, error });
    }

    /// Record a trial cancelled before it started
    pub fn record_cancelled(&mut self, id: String) {
        self.cancelled.push(id);
    }

    /// Stamp the end of the batch
    pub fn finish(&mut self, elapsed: Duration) {
        self.finished_at = Some(Utc::now());
        self.elapsed_secs = elapsed.as_secs_f64();
    }

    /// Write the full report as pretty JSON
    pub fn export(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        serde_json::to_writer_pretty(file, self).map_err(|e| Error::json(path, e))?;
        Ok(())
    }

    /// Print a console summary
    pub fn print_summary(&self) {
        println!("{}", "=".repeat(70));
        println!("   Batch Results");
        println!("{}", "=".repeat(70));
        println!();
        println!("  Trials:      {}", self.total);
        println!("  Completed:   {}", self.completed.len());
        println!("  Failed:      {}", self.failed.len());
        println!("  Cancelled:   {}", self.cancelled.len());
        println!("  Elapsed:     {:.1} s", self.elapsed_secs);

        if !self.no_solution_by_scene.is_empty() {
            println!();
            println!("  Completed trials with no sorted output (no solution found):");
            for (scene, count) in &self.no_solution_by_scene {
                println!("    {scene}: {count}");
            }
        }

        if !self.failed.is_empty() {
            println!();
            println!("  Failed trials:");
            for failed in &self.failed {
                println!("    {}: {}", failed.id, failed.error);
            }
        }

        println!("{}", "=".repeat(70));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trial_report(scene: &str, seed: u64, sorted: bool) -> TrialReport {
        TrialReport {
            id: format!("{scene}/sipp/f0/{seed}"),
            scene: scene.to_string(),
            variant: "sipp".to_string(),
            folder: "f0".to_string(),
            seed,
            exit_code: Some(0),
            timed_out: false,
            process_fault: None,
            objects: None,
            merged_robots: usize::from(sorted),
            sorted,
        }
    }

    #[test]
    fn test_no_solution_counting() {
        let mut report = BatchReport::new(4, 2);
        report.record_completed(trial_report("random", 1, true));
        report.record_completed(trial_report("random", 2, false));
        report.record_completed(trial_report("shelf", 3, false));
        report.record_completed(trial_report("shelf", 4, false));

        assert_eq!(report.no_solution_by_scene["random"], 1);
        assert_eq!(report.no_solution_by_scene["shelf"], 2);
    }

    #[test]
    fn test_export_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut report = BatchReport::new(2, 1);
        report.record_completed(trial_report("random", 1, true));
        report.record_failed(
            "random/sipp/f0/2".to_string(),
            "output namespace collision".to_string(),
        );
        report.finish(Duration::from_secs(3));

        let path = dir.path().join("report.json");
        report.export(&path).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["total"], 2);
        assert_eq!(parsed["completed"].as_array().unwrap().len(), 1);
        assert_eq!(parsed["failed"][0]["id"], "random/sipp/f0/2");
    }
}
