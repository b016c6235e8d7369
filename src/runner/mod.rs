//! Trial execution
//!
//! One trial runs in two phases. Execute: build the planner invocation from
//! the descriptor and run it to completion, treating the exit status as
//! advisory only — non-zero exits and crashes are expected under random
//! search. Collect: merge and sort whatever raw files exist in the log
//! directory, unconditionally, so a crashed trial still yields its partial
//! output.
//!
//! The [`PlannerInvoker`] trait is the seam between the two phases:
//! collection is exercised in tests with a mock invoker that writes fixture
//! files instead of spawning a binary.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;

use crate::error::Result;
use crate::jobs::{self, TrialDescriptor};
use crate::merge::merge_robot_results;
use crate::namespace::{OutputRoots, TrialPaths};
use crate::sort::sort_robot_log;

/// How a planner process ended
///
/// None of these are trial-fatal; the verdict is recorded on the report and
/// collection proceeds regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessVerdict {
    /// Process exited with the given code
    Exited(i32),
    /// Process was terminated by a signal
    Signaled,
    /// Process exceeded the wall-clock limit and was killed
    TimedOut,
}

/// Seam for running one planner process
///
/// The production implementation spawns the external binary; tests supply a
/// mock that populates the log directory directly.
#[async_trait]
pub trait PlannerInvoker: Send + Sync {
    /// Run the planner for `trial`, logging into `log_dir`, to completion
    async fn invoke(
        &self,
        trial: &TrialDescriptor,
        log_dir: &Path,
    ) -> std::io::Result<ProcessVerdict>;
}

/// Spawns the variant's planner executable per the command-line contract
#[derive(Debug, Clone, Default)]
pub struct ProcessInvoker {
    /// Optional wall-clock ceiling; a hung planner would otherwise stall
    /// its worker slot indefinitely
    pub timeout: Option<Duration>,
}

impl ProcessInvoker {
    /// Create an invoker with the given per-trial timeout
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    fn command(trial: &TrialDescriptor, log_dir: &Path) -> Command {
        let mut command = Command::new(&trial.variant.program);
        command
            .arg("-pnp")
            .arg("true")
            .arg("-mode")
            .arg("random_search")
            .arg("-seed")
            .arg(trial.seed.to_string())
            .arg("-robot_path")
            .arg(trial.inputs.robots())
            .arg("-obj_path")
            .arg(trial.inputs.objects());
        if let Some(scene) = trial.inputs.scene() {
            command.arg("-scene_path").arg(scene);
        }
        if let Some(obstacles) = trial.inputs.obstacles() {
            command.arg("-obstacle_path").arg(obstacles);
        }
        command
            .arg("-logdir")
            .arg(log_dir)
            .arg("-attempt_komo")
            .arg("false")
            .arg("-display")
            .arg("false")
            .arg("-export_images")
            .arg("false")
            .arg("-verbose")
            .arg("0")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl PlannerInvoker for ProcessInvoker {
    async fn invoke(
        &self,
        trial: &TrialDescriptor,
        log_dir: &Path,
    ) -> std::io::Result<ProcessVerdict> {
        let mut child = Self::command(trial, log_dir).spawn()?;

        let status = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    child.kill().await?;
                    return Ok(ProcessVerdict::TimedOut);
                }
            },
            None => child.wait().await?,
        };

        Ok(match status.code() {
            Some(code) => ProcessVerdict::Exited(code),
            None => ProcessVerdict::Signaled,
        })
    }
}

/// Per-trial outcome record, aggregated into the batch report
#[derive(Debug, Clone, Serialize)]
pub struct TrialReport {
    /// Trial identity, `scene/variant/folder/seed`
    pub id: String,
    /// Scene name
    pub scene: String,
    /// Planner variant tag
    pub variant: String,
    /// Configuration folder
    pub folder: String,
    /// Random seed
    pub seed: u64,
    /// Planner exit code, when the process exited normally
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Whether the planner was killed on timeout
    pub timed_out: bool,
    /// Invocation fault (e.g. executable not found); the trial still went
    /// through collection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_fault: Option<String>,
    /// Number of objects in the trial's instance, when readable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objects: Option<usize>,
    /// Number of success-filtered robot results merged
    pub merged_robots: usize,
    /// Whether a sorted robot log was produced
    pub sorted: bool,
}

impl TrialReport {
    fn new(trial: &TrialDescriptor) -> Self {
        Self {
            id: trial.id(),
            scene: trial.scene.clone(),
            variant: trial.variant.tag.clone(),
            folder: trial.folder.clone(),
            seed: trial.seed,
            exit_code: None,
            timed_out: false,
            process_fault: None,
            objects: None,
            merged_robots: 0,
            sorted: false,
        }
    }
}

/// Runs single trials end to end: allocate, execute, collect
pub struct TrialRunner {
    invoker: Arc<dyn PlannerInvoker>,
    roots: OutputRoots,
}

impl TrialRunner {
    /// Create a runner with a custom invoker (tests)
    pub fn new(invoker: Arc<dyn PlannerInvoker>, roots: OutputRoots) -> Self {
        Self { invoker, roots }
    }

    /// Create a runner that spawns real planner processes
    pub fn process(roots: OutputRoots, timeout: Option<Duration>) -> Self {
        Self::new(Arc::new(ProcessInvoker::new(timeout)), roots)
    }

    /// Run one trial
    ///
    /// Only namespace allocation can fail a trial before execution; planner
    /// faults of any kind are contained on the report and collection runs
    /// over whatever the process left behind.
    pub async fn run_trial(&self, trial: &TrialDescriptor) -> Result<TrialReport> {
        let paths = TrialPaths::allocate(&self.roots, trial)?;
        let mut report = TrialReport::new(trial);

        report.objects = match jobs::object_count(trial.inputs.objects()) {
            Ok(count) => Some(count),
            Err(e) => {
                tracing::warn!(trial = %report.id, error = %e, "could not read object count");
                None
            }
        };

        tracing::debug!(trial = %report.id, log_dir = %paths.raw_log_dir.display(), "trial started");

        match self.invoker.invoke(trial, &paths.raw_log_dir).await {
            Ok(ProcessVerdict::Exited(code)) => {
                report.exit_code = Some(code);
                if code != 0 {
                    tracing::warn!(
                        trial = %report.id,
                        code,
                        "planner exited non-zero, aggregating partial output"
                    );
                }
            }
            Ok(ProcessVerdict::Signaled) => {
                tracing::warn!(trial = %report.id, "planner terminated by signal");
            }
            Ok(ProcessVerdict::TimedOut) => {
                report.timed_out = true;
                tracing::warn!(trial = %report.id, "planner exceeded wall-clock limit, killed");
            }
            Err(e) => {
                tracing::warn!(trial = %report.id, error = %e, "planner invocation failed");
                report.process_fault = Some(e.to_string());
            }
        }

        report.merged_robots = merge_robot_results(&paths.raw_log_dir, &paths.merged_path)?;
        report.sorted = sort_robot_log(&paths.merged_path, &paths.sorted_path)?.is_some();

        tracing::debug!(
            trial = %report.id,
            merged_robots = report.merged_robots,
            sorted = report.sorted,
            "trial finished"
        );
        Ok(report)
    }
}
