//! Worker-pool scheduling
//!
//! The scheduler spawns one task per enumerated trial and bounds how many
//! run at once with a semaphore sized to the worker count; each trial holds
//! a permit for the full lifetime of its planner process, which is the
//! dominant cost. A broadcast channel carries the shutdown signal: tasks
//! that have not yet acquired a permit stop cleanly, in-flight trials run
//! to completion. Every spawned handle is awaited exactly once, and a
//! failed or panicked trial is recorded in the batch report without
//! cancelling its siblings.

use std::sync::Arc;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::{broadcast, Semaphore};

use crate::error::{Error, Result};
use crate::jobs::TrialDescriptor;
use crate::report::BatchReport;
use crate::runner::{TrialReport, TrialRunner};

enum TaskOutcome {
    Completed(TrialReport),
    Failed(String),
    Cancelled,
}

/// Executes a trial batch with bounded concurrency
pub struct Scheduler {
    runner: Arc<TrialRunner>,
    workers: usize,
    semaphore: Arc<Semaphore>,
    shutdown_tx: broadcast::Sender<()>,
}

/// Builder for creating a Scheduler
///
/// # Example
/// ```ignore
/// let scheduler = SchedulerBuilder::new()
///     .runner(runner)
///     .workers(4)
///     .build()?;
/// let report = scheduler.run(trials).await;
/// ```
pub struct SchedulerBuilder {
    runner: Option<Arc<TrialRunner>>,
    workers: usize,
}

impl SchedulerBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            runner: None,
            workers: 1,
        }
    }

    /// Set the trial runner
    pub fn runner(mut self, runner: Arc<TrialRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Set the worker pool size
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Build the scheduler
    ///
    /// # Errors
    /// Returns an error if the runner is missing or the worker count is zero.
    pub fn build(self) -> Result<Scheduler> {
        let runner = self
            .runner
            .ok_or_else(|| Error::config("scheduler requires a trial runner"))?;
        if self.workers == 0 {
            return Err(Error::config("workers must be at least 1"));
        }
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Scheduler {
            runner,
            workers: self.workers,
            semaphore: Arc::new(Semaphore::new(self.workers)),
            shutdown_tx,
        })
    }
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Stop admitting new trials; in-flight ones finish
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Clone of the shutdown sender, for wiring external triggers
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Run the whole batch and collect the report
    pub async fn run(&self, trials: Vec<TrialDescriptor>) -> BatchReport {
        let started = Instant::now();
        let total = trials.len();

        tracing::info!(total, workers = self.workers, "starting trial batch");

        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
                )
                .unwrap()
                .progress_chars("#>-"),
        );

        let mut handles = Vec::with_capacity(total);
        for trial in trials {
            let runner = Arc::clone(&self.runner);
            let semaphore = Arc::clone(&self.semaphore);
            let mut shutdown = self.shutdown_tx.subscribe();
            let pb = pb.clone();
            let id = trial.id();

            let handle = tokio::spawn(async move {
                // A shutdown that lands before the permit means this trial
                // never starts; trials already holding a permit finish.
                let acquire = semaphore.acquire_owned();
                let _permit = tokio::select! {
                    biased;
                    _ = shutdown.recv() => return TaskOutcome::Cancelled,
                    permit = acquire => match permit {
                        Ok(permit) => permit,
                        Err(_) => return TaskOutcome::Cancelled,
                    },
                };

                let outcome = match runner.run_trial(&trial).await {
                    Ok(report) => TaskOutcome::Completed(report),
                    Err(e) => TaskOutcome::Failed(e.to_string()),
                };
                pb.inc(1);
                outcome
            });
            handles.push((id, handle));
        }

        let mut report = BatchReport::new(total, self.workers);
        for (id, handle) in handles {
            match handle.await {
                Ok(TaskOutcome::Completed(trial_report)) => {
                    report.record_completed(trial_report);
                }
                Ok(TaskOutcome::Failed(error)) => {
                    tracing::error!(trial = %id, %error, "trial failed");
                    report.record_failed(id, error);
                }
                Ok(TaskOutcome::Cancelled) => {
                    report.record_cancelled(id);
                }
                Err(e) => {
                    tracing::error!(trial = %id, error = %e, "trial task panicked");
                    report.record_failed(id, format!("task panicked: {e}"));
                }
            }
        }
        pb.finish_and_clear();

        report.finish(started.elapsed());
        tracing::info!(
            completed = report.completed.len(),
            failed = report.failed.len(),
            cancelled = report.cancelled.len(),
            elapsed_secs = report.elapsed_secs,
            "trial batch finished"
        );
        report
    }

    /// Run with Ctrl+C wired to the clean shutdown path
    pub async fn run_with_signal_handling(&self, trials: Vec<TrialDescriptor>) -> BatchReport {
        let shutdown_tx = self.shutdown_tx.clone();

        let signal_handle = tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("received Ctrl+C, letting in-flight trials finish");
                    let _ = shutdown_tx.send(());
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to listen for Ctrl+C");
                }
            }
        });

        let report = self.run(trials).await;
        signal_handle.abort();
        report
    }
}
