//! # Emitters Module
//!
//! ## Purpose
//! Writes the Pattern Model out as text. Both emitters are pure: they return file contents
//! and never touch the filesystem, and the same model (plus label map) always gives
//! byte-identical text.
//!
//! ## Emitters
//! - `bngl_writer::network_to_bngl`: rule-language file handed to the network-expansion
//!   tool (`begin parameters` ... `end reaction rules`)
//! - `mdl_writer::MdlWriter`: simulation-format file set (`<base>.main.mdl` including
//!   molecules, reactions, surface classes, region modifications, seeds and output)
//!
//! ## Proxies
//! Graph-pattern species are opaque to the simulation engine. Seeds are released as one of
//! two proxy molecules (`volume_proxy`, `surface_proxy`) and carry their canonical label as
//! `GRAPH_PATTERN`; a few fixed reactions at rate `1e-15` keep the proxies known to the
//! engine's reaction bookkeeping.
use crate::PatternModel::ModelError;
use serde::Serialize;
use thiserror::Error;

pub mod bngl_writer;
pub mod mdl_writer;


pub use bngl_writer::network_to_bngl;
pub use mdl_writer::MdlWriter;

#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum EmitError {
    #[error("seed species {seed} has no canonical label")]
    MissingLabel { seed: String },
    #[error(transparent)]
    Model(#[from] ModelError),
}
