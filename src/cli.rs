//! Command line entry point: `kirulenet <translate|bngl|split|inspect>`.
pub mod cli_main;

pub use cli_main::{Cli, CliError, Command, cli_main, run, run_with};
