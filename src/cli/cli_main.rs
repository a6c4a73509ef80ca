use crate::Canonical::create_oracle_by_name;
use crate::Driver::pipeline::parse_source;
use crate::Driver::{BngExpander, Pipeline, PipelineFailure, StageError};
use crate::Emitters::network_to_bngl;
use crate::Interchange::{read_network, split_species};
use crate::PatternModel::Network;
use crate::PatternModel::builder::network_from_sections;
use crate::Utils::init_logger;
use crate::settings::{SettingsError, TranslatorConfig};
use clap::{ArgAction, Parser, Subcommand};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(name = "kirulenet")]
#[command(about = "Translates rule-based reaction models into simulation input files")]
pub struct Cli {
    /// more output; repeat for debug (-vv) and trace (-vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    /// config file (default: kirulenet_config.json in the working directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Full translation into the simulation file set
    Translate {
        source: PathBuf,
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
        /// file name prefix (default: source file stem)
        #[arg(short, long)]
        base: Option<String>,
    },
    /// Write the rule-language form of a source
    Bngl {
        source: PathBuf,
        /// output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Split an interchange document into the rest and its species list
    Split {
        document: PathBuf,
        #[arg(long)]
        rest: PathBuf,
        #[arg(long)]
        species: PathBuf,
    },
    /// Show the model held in a source or interchange document
    Inspect {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] SettingsError),
    #[error("Failed({}, {})", .0.stage, .0.source)]
    Pipeline(#[from] PipelineFailure),
    #[error(transparent)]
    Step(#[from] StageError),
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot serialize model: {0}")]
    Json(#[from] serde_json::Error),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> CliError + '_ {
    move |source| CliError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn load_config(cli: &Cli) -> Result<TranslatorConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => TranslatorConfig::load(path)?,
        None => TranslatorConfig::load_default()?,
    };
    if cli.verbose > 0 {
        config.verbosity = cli.verbose;
    }
    Ok(config)
}

fn source_network(path: &Path) -> Result<Network, CliError> {
    let text = fs::read_to_string(path).map_err(io_error(path))?;
    if path.extension().and_then(|e| e.to_str()) == Some("xml") {
        return Ok(read_network(&text).map_err(StageError::from)?);
    }
    let tree = parse_source(path, &text).map_err(StageError::from)?;
    Ok(network_from_sections(&tree).map_err(StageError::from)?)
}

fn translate(config: &TranslatorConfig, source: &Path, out_dir: &Path, base: Option<&str>) -> Result<(), CliError> {
    let base = match base {
        Some(b) => b.to_string(),
        None => source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "model".to_string()),
    };
    let mut oracle = create_oracle_by_name(&config.oracle).map_err(StageError::from)?;
    let expander = BngExpander::from_config(config);
    let mut pipeline = Pipeline::new(config);
    let files = pipeline.run(&expander, &mut oracle, source, out_dir, &base)?;
    for file in files {
        println!("{}", file.display());
    }
    Ok(())
}

/// Runs one command with an already loaded config.
pub fn run_with(cli: &Cli, config: &TranslatorConfig) -> Result<(), CliError> {
    match &cli.command {
        Command::Translate { source, out_dir, base } => translate(config, source, out_dir, base.as_deref()),
        Command::Bngl { source, output } => {
            let text = network_to_bngl(&source_network(source)?).map_err(StageError::from)?;
            match output {
                Some(path) => {
                    fs::write(path, text).map_err(io_error(path))?;
                    info!("wrote {}", path.display());
                }
                None => print!("{}", text),
            }
            Ok(())
        }
        Command::Split { document, rest, species } => {
            let text = fs::read_to_string(document).map_err(io_error(document))?;
            let (rest_doc, fragment) = split_species(&text).map_err(StageError::from)?;
            fs::write(rest, rest_doc).map_err(io_error(rest))?;
            fs::write(species, fragment).map_err(io_error(species))?;
            Ok(())
        }
        Command::Inspect { file, json } => {
            let network = source_network(file)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&network)?);
            } else {
                print!("{}", network.pretty_print());
            }
            Ok(())
        }
    }
}

pub fn run(cli: &Cli) -> Result<(), CliError> {
    let config = load_config(cli)?;
    run_with(cli, &config)
}

pub fn cli_main() -> ExitCode {
    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = init_logger(config.verbosity, config.log_file.as_deref()) {
        eprintln!("logging disabled: {}", e);
    }
    match run_with(&cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            warn!("run ended with an error");
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
