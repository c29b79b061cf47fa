use std::process::ExitCode;

fn main() -> ExitCode {
    callsheet_cli::run()
}
