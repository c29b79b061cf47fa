pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use callsheet_core::ExportSelection;
use clap::Parser;

use crate::commands::export::ExportOptions;

#[derive(Debug, Parser)]
#[command(
    name = "callsheet",
    about = "Export relevant Vapi call logs into Google Sheets",
    long_about = "Fetch every call for each configured assistant, drop short calls, and overwrite the matching sheet range. Pass an export name to run only that pair.",
    after_help = "Examples:\n  callsheet\n  callsheet pepfactor_outbound\n  callsheet --dry-run --json\n  callsheet --list"
)]
pub struct Cli {
    #[arg(value_name = "EXPORT", help = "Run only this configured export (default: all)")]
    export: Option<String>,
    #[arg(long, value_name = "PATH", help = "Read configuration from this TOML file")]
    config: Option<PathBuf>,
    #[arg(long, help = "Fetch and filter without writing to the spreadsheet")]
    dry_run: bool,
    #[arg(
        long,
        conflicts_with_all = ["export", "dry_run"],
        help = "List configured exports and exit"
    )]
    list: bool,
    #[arg(long, help = "Emit machine-readable JSON output")]
    json: bool,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = if cli.list {
        commands::list::run(cli.config, cli.json)
    } else {
        commands::export::run(ExportOptions {
            selection: ExportSelection::from_arg(cli.export),
            config_path: cli.config,
            dry_run: cli.dry_run,
            json: cli.json,
        })
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
