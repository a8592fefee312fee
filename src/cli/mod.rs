//! Command-line surface of the `docbatch` binary

pub mod args;
pub mod router;

pub use args::{Cli, Commands, JobArgs};
pub use router::execute_command;

/// Log filter for a `-v` count
pub fn get_log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}
