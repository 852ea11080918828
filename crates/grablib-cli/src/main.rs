use clap::Parser;
use grablib_core::logging::{self, Verbosity};

mod cli;

use crate::cli::Cli;

fn main() {
    let cli = Cli::parse();
    let verbosity = Verbosity::from(cli.verbosity);

    // Fall back to stderr-only logging when the log file can't be opened.
    if let Err(e) = logging::init_logging(verbosity) {
        logging::init_logging_stderr(verbosity);
        tracing::debug!("file logging unavailable: {:#}", e);
    }

    if let Err(err) = cli.run() {
        if verbosity != Verbosity::High {
            eprintln!("use \"--verbosity high\" for more details");
        }
        eprintln!("grablib error: {:#}", err);
        std::process::exit(1);
    }
}
