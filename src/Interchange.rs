//! # Interchange Module
//!
//! ## Purpose
//! Reads the network-interchange document written by the external rule-expansion tool
//! (an SBML-like XML file: `sbml/model/ListOfMoleculeTypes`, `ListOfSpecies`,
//! `ListOfReactionRules`, ...) into the Pattern Model, and provides the split utility that
//! moves the seed-species list into a standalone fragment so the rest of the network can
//! be handed to the canonicalization oracle without seed information.
//!
//! ## Main Functions
//! - `reader::read_network(doc)`: whole document to `Network`
//! - `reader::read_network_parts(rest, fragment)`: remainder with an empty species
//!   placeholder plus the separately supplied species fragment, read as one source
//! - `split::split_species(doc)` / `split::merge_species(rest, fragment)`
//! - `writer::network_to_xml(network)`: writes the same document shape, used to produce
//!   fixtures and by the `bngl`-free test expander
//!
//! ## Rules and actions
//! Rule operations (`AddBond`, `DeleteBond`, `StateChange`, `Add`, `Delete`) and the
//! `Map` are copied from the document as they are. They are never re-derived.
use crate::PatternModel::ModelError;
use serde::Serialize;
use thiserror::Error;

pub mod reader;
pub mod split;
pub mod writer;
pub mod xml_tree;


pub use reader::{read_network, read_network_parts};
pub use split::{merge_species, split_species};
pub use writer::network_to_xml;

#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum InterchangeError {
    /// required section missing or unusable
    #[error("malformed interchange document: {section}")]
    Malformed { section: String },
    #[error("XML error at byte {position}: {message}")]
    Xml { position: usize, message: String },
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl InterchangeError {
    pub fn malformed(section: &str) -> Self {
        InterchangeError::Malformed {
            section: section.to_string(),
        }
    }
}
