//! Command routing and execution

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::batch::{BatchRun, CheckpointStore, RunOptions, RunSummary, ShutdownSignal};
use crate::cli::args::Cli;
use crate::config::{ConfigLoader, JobConfig};
use crate::error::BatchError;
use crate::store::StoreFactory;

/// Resolve the job configuration and run it to completion
pub async fn execute_command(cli: &Cli, shutdown: ShutdownSignal) -> Result<RunSummary> {
    let args = cli.command.args();
    let config = ConfigLoader::new()
        .with_file(cli.config.clone())
        .load(cli.command.job(), &args.overrides(cli.store_dir.clone()))
        .await?;
    debug!("Resolved job configuration: {:?}", config);

    let mut run = build_run(&config, shutdown).await?;
    if config.checkpoint.enabled {
        run = run.with_checkpoints(CheckpointStore::new(&config.checkpoint.path), args.resume);
    } else if args.resume {
        warn!("--resume ignored: checkpoints are disabled for this job");
    }

    let summary = run
        .run()
        .await
        .with_context(|| format!("{} on '{}' did not complete", config.job, config.collection))?;
    Ok(summary)
}

async fn build_run(config: &JobConfig, shutdown: ShutdownSignal) -> Result<BatchRun, BatchError> {
    let store = StoreFactory::from_config(&config.store)
        .await
        .map_err(|e| BatchError::setup(config.store.backend.to_string(), e))?;

    let options = RunOptions {
        job: config.job.to_string(),
        collection: config.collection.clone(),
        page_size: config.page_size,
        max_batch_size: config.max_batch_size,
        scan_mode: config.scan_mode,
        dry_run: config.dry_run,
        retry: config.retry.clone(),
        call_timeout: config.store.timeout,
    };
    Ok(BatchRun::new(store, config.policy_spec().build(), options).with_shutdown(shutdown))
}
