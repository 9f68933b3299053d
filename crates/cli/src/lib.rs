//! Command-line front end of webguard: argument parsing, configuration
//! merging, the scan command and rule listing.

use tracing::level_filters::LevelFilter;

pub mod args;
pub mod config;
pub mod output;
pub mod rules;
pub mod scan;
pub mod ui;

/// Installs the stderr log subscriber. `quiet` wins over `debug`.
pub fn init_tracing(debug: bool, quiet: bool) {
    let level = if quiet {
        LevelFilter::OFF
    } else if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
