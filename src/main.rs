use clap::Parser;
use docbatch::batch::shutdown_signal;
use docbatch::cli::{execute_command, get_log_level, Cli};
use docbatch::error::BatchError;
use tracing::{debug, error, trace};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // An explicit -v wins over the environment.
    let log_level = match (cli.verbose, std::env::var("RUST_LOG"), std::env::var("DOCBATCH_LOG_LEVEL")) {
        (0, Ok(filter), _) | (0, Err(_), Ok(filter)) => filter,
        (verbose, _, _) => get_log_level(verbose).to_string(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .init();

    debug!("docbatch started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    let shutdown = shutdown_signal();
    match execute_command(&cli, shutdown).await {
        Ok(summary) => {
            if summary.nothing_to_do() {
                println!("Nothing to do: no document of '{}' needed changes", summary.collection);
            }
            println!("{summary}");
        }
        Err(e) => {
            error!("Fatal error: {:#}", e);
            let batch_error = e.downcast_ref::<BatchError>();
            eprintln!("Error: {e:#}");
            if let Some(batch_error) = batch_error {
                eprintln!("  {}", batch_error.describe());
            }
            std::process::exit(batch_error.map_or(1, BatchError::exit_code));
        }
    }
}
