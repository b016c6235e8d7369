//! CLI argument parsing and batch entrypoint

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use crate::config::BatchConfig;
use crate::jobs::enumerate_trials;
use crate::namespace::OutputRoots;
use crate::runner::TrialRunner;
use crate::scheduler::SchedulerBuilder;

/// planbench - batch orchestrator for motion-planning experiments
#[derive(Parser, Debug)]
#[command(name = "planbench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the batch configuration file (JSON)
    #[arg(short, long, default_value = "batch.json")]
    pub config: PathBuf,

    /// Worker pool size (overrides the config file)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Root for raw per-trial planner logs (overrides the config file)
    #[arg(long)]
    pub log_root: Option<PathBuf>,

    /// Root for aggregated per-scene results (overrides the config file)
    #[arg(long)]
    pub result_root: Option<PathBuf>,

    /// Per-trial wall-clock timeout in seconds, 0 disables (overrides the
    /// config file)
    #[arg(long)]
    pub trial_timeout_secs: Option<u64>,

    /// Enumerate the trial batch and exit without running anything
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// Run the batch described by the configuration
    pub async fn run(&self) -> Result<()> {
        let mut config = BatchConfig::load(&self.config)
            .with_context(|| format!("failed to load batch config from {}", self.config.display()))?;

        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(ref log_root) = self.log_root {
            config.log_root = log_root.clone();
        }
        if let Some(ref result_root) = self.result_root {
            config.result_root = result_root.clone();
        }
        if let Some(secs) = self.trial_timeout_secs {
            config.trial_timeout_secs = (secs > 0).then_some(secs);
        }
        config.validate()?;

        let trials = enumerate_trials(&config)?;
        tracing::info!(
            trials = trials.len(),
            scenes = config.scenes.len(),
            workers = config.workers,
            "enumerated trial batch"
        );

        if self.dry_run {
            for trial in &trials {
                println!("{}", trial.id());
            }
            return Ok(());
        }

        let roots = OutputRoots {
            log_root: config.log_root.clone(),
            result_root: config.result_root.clone(),
        };
        let timeout = config.trial_timeout_secs.map(Duration::from_secs);
        let runner = Arc::new(TrialRunner::process(roots, timeout));
        let scheduler = SchedulerBuilder::new()
            .runner(runner)
            .workers(config.workers)
            .build()?;

        let report = scheduler.run_with_signal_handling(trials).await;
        report.print_summary();

        std::fs::create_dir_all(&config.result_root).with_context(|| {
            format!(
                "failed to create result root {}",
                config.result_root.display()
            )
        })?;
        let report_path = config.result_root.join("report.json");
        report.export(&report_path)?;
        println!("Report written to {}", report_path.display());

        Ok(())
    }
}
