//! # Driver Module
//!
//! ## Purpose
//! Runs one translation from a model-description source to the simulation file set:
//!
//! ```text
//! ParseSource -> EmitInterchangeInput -> NetworkExpansion (external tool)
//!   -> SplitInterchangeOutput -> CanonicalizeSeeds -> BuildPatternModel
//!   -> EmitFinalFiles -> Done
//! ```
//! Any stage can end the run in `Failed(stage, message)`. Nothing retries; the caller
//! decides whether to run the whole pipeline again.
//!
//! ## Structure
//! - `expansion`: the `NetworkExpander` seam and the subprocess adapter for the
//!   rule-expansion tool (optional bounded wait)
//! - `pipeline`: the stage sequence and its state
//!
//! ## Output
//! Final files are written through `Utils::file_set`, so a failed run leaves no partial
//! file set behind. Intermediate files live in a temporary directory unless the config
//! asks to keep them.
use crate::Canonical::OracleError;
use crate::Emitters::EmitError;
use crate::Grammar::GrammarError;
use crate::Interchange::InterchangeError;
use crate::PatternModel::ModelError;
use std::fmt;
use thiserror::Error;

pub mod expansion;
pub mod pipeline;


pub use expansion::{BngExpander, ExpansionError, NetworkExpander};
pub use pipeline::{Pipeline, PipelineState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ParseSource,
    EmitInterchangeInput,
    NetworkExpansion,
    SplitInterchangeOutput,
    CanonicalizeSeeds,
    BuildPatternModel,
    EmitFinalFiles,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::ParseSource,
        Stage::EmitInterchangeInput,
        Stage::NetworkExpansion,
        Stage::SplitInterchangeOutput,
        Stage::CanonicalizeSeeds,
        Stage::BuildPatternModel,
        Stage::EmitFinalFiles,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::ParseSource => "ParseSource",
            Stage::EmitInterchangeInput => "EmitInterchangeInput",
            Stage::NetworkExpansion => "NetworkExpansion",
            Stage::SplitInterchangeOutput => "SplitInterchangeOutput",
            Stage::CanonicalizeSeeds => "CanonicalizeSeeds",
            Stage::BuildPatternModel => "BuildPatternModel",
            Stage::EmitFinalFiles => "EmitFinalFiles",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Whatever went wrong inside a stage.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Interchange(#[from] InterchangeError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Emit(#[from] EmitError),
    #[error(transparent)]
    Expansion(#[from] ExpansionError),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl StageError {
    pub fn io(context: &str, source: std::io::Error) -> Self {
        StageError::Io {
            context: context.to_string(),
            source,
        }
    }
}

#[derive(Debug, Error)]
#[error("stage '{stage}' failed: {source}")]
pub struct PipelineFailure {
    pub stage: Stage,
    #[source]
    pub source: StageError,
}
