use KiRuleNet::cli::cli_main;
use std::process::ExitCode;

fn main() -> ExitCode {
    cli_main()
}
