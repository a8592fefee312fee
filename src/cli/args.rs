//! CLI argument structures

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{JobKind, JobOverrides};

/// Run batch maintenance jobs against a document store
#[derive(Parser, Debug)]
#[command(name = "docbatch")]
#[command(about = "docbatch - Bulk delete and migrate documents in bounded atomic batches", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to a TOML job file
    #[arg(short = 'c', long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Data directory of the file store
    #[arg(long, value_name = "DIR", global = true)]
    pub store_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Delete every document in the log collection
    #[command(name = "purge-logs")]
    PurgeLogs(JobArgs),

    /// Convert YYYY-MM-DD date strings on agreements into timestamps
    #[command(name = "migrate-dates")]
    MigrateDates(JobArgs),

    /// Set a missing company on members to "N/A"
    #[command(name = "backfill-company")]
    BackfillCompany(JobArgs),

    /// Run the job described by the config file
    #[command(name = "run")]
    Run(JobArgs),
}

impl Commands {
    /// The preset selected by the subcommand; `run` takes it from the file
    pub fn job(&self) -> Option<JobKind> {
        match self {
            Commands::PurgeLogs(_) => Some(JobKind::PurgeLogs),
            Commands::MigrateDates(_) => Some(JobKind::MigrateDates),
            Commands::BackfillCompany(_) => Some(JobKind::BackfillCompany),
            Commands::Run(_) => None,
        }
    }

    pub fn args(&self) -> &JobArgs {
        match self {
            Commands::PurgeLogs(args)
            | Commands::MigrateDates(args)
            | Commands::BackfillCompany(args)
            | Commands::Run(args) => args,
        }
    }
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct JobArgs {
    /// Collection to process instead of the job's default
    #[arg(long, value_name = "NAME")]
    pub collection: Option<String>,

    /// Maximum number of writes per atomic batch (1-500)
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Number of documents fetched per page
    #[arg(long, value_name = "N")]
    pub page_size: Option<usize>,

    /// Show what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Continue after the last checkpoint of an interrupted run
    #[arg(long)]
    pub resume: bool,
}

impl JobArgs {
    pub fn overrides(&self, store_dir: Option<PathBuf>) -> JobOverrides {
        JobOverrides {
            collection: self.collection.clone(),
            page_size: self.page_size,
            max_batch_size: self.batch_size,
            store_dir,
            dry_run: self.dry_run,
        }
    }
}
