//! Entry point for the command-line interface.
//! Delegates to dedicated modules for argument handling, scanning and
//! rule listing.

use std::process::ExitCode;

use webguard::args::{parse_cli, Commands, RulesCmd};
use webguard::init_tracing;
use webguard::rules::{list_rules, show_rule};
use webguard::scan::run_scan;

fn main() -> anyhow::Result<ExitCode> {
    let cli = parse_cli();
    match cli.command {
        Commands::Scan(args) => {
            init_tracing(args.debug, args.quiet);
            let failed = run_scan(&args)?;
            Ok(if failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Commands::Rules(RulesCmd::List { json }) => {
            list_rules(json)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Rules(RulesCmd::Show { id }) => {
            show_rule(&id)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
