//! # Canonical Module
//!
//! ## Purpose
//! Gives every seed species a canonical label: a string that is the same for two species
//! that are isomorphic under molecule and component reordering and different otherwise.
//! The simulation emitter embeds the label verbatim as the `GRAPH_PATTERN` of the seed.
//!
//! ## Structure
//! - `oracle`: the `CanonicalOracle` call surface (`init`, `reset`, `init_from_xml`, `query`)
//!   and the `OracleBackend` enum the pipeline holds
//! - `native_oracle`: in-process canonicalizer (colour refinement plus individualization)
//! - `label_service`: drives an oracle over the split species fragment, one seed at a time,
//!   and keeps the ranked label whose molecule-name multiset matches the seed
//!
//! ## Oracle state
//! An oracle accumulates the network definition and the submitted species between calls.
//! Each translation run creates its own oracle and calls it strictly in sequence.
use crate::Interchange::InterchangeError;
use serde::Serialize;
use thiserror::Error;

pub mod label_service;
pub mod native_oracle;
pub mod oracle;

mod canonical_tests;

pub use label_service::{LabelMap, label_seeds, molecule_names};
pub use native_oracle::{NativeOracle, canonical_string};
pub use oracle::{CanonicalOracle, OracleBackend, ScriptedOracle, create_oracle_by_name};

#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum OracleError {
    /// backend missing, not initialised or unable to answer; aborts the pipeline
    #[error("canonicalization oracle unavailable: {0}")]
    Unavailable(String),
    #[error("no canonical label matches seed species {species}")]
    NoMatchingLabel { species: String },
    #[error(transparent)]
    Interchange(#[from] InterchangeError),
}
