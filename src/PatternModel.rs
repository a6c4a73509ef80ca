//! # Pattern Model
//!
//! ## Purpose
//! In-memory structural model of a reaction network: molecule types, species graphs
//! (molecules, components, bond edges), reaction rules with their actions and
//! reactant-to-product mapping, compartments, observables, parameters, functions and
//! seed species. Plus the extra simulation settings of the model-description language
//! (iterations, diffusion constants, scene objects, release sites, output counts) that
//! the simulation emitter needs but the rule language does not carry.
//!
//! ## Main Data Structures
//! - `MoleculeType` / `ComponentDef`: declared templates
//! - `Species`: immutable graph; bond labels are resolved into edges on construction
//! - `ReactionRule` / `Action` / `MapItem`: a rule and the operations it performs
//! - `Network`: owns everything for one translation run
//!
//! ## Building
//! `builder::network_from_sections` turns a parsed `SectionTree` (either surface syntax)
//! into a `Network`. The interchange reader builds the same `Network` from the external
//! tool's document.
//!
//! ## Invariants
//! - a concrete bond label occurs on exactly two component occurrences of one species
//! - names are unique per category (molecule types, parameters, compartments, ...)
//! - compartment parents are declared and form a forest
//! - every action site resolves to a component occurrence of the rule's patterns
use serde::Serialize;
use thiserror::Error;

pub mod actions;
pub mod builder;
pub mod network;
pub mod species;

mod model_tests;

pub use actions::{Action, MapItem, PatternSite, Side};
pub use network::{
    Compartment, Function, Network, Observable, ObservableKind, Parameter, RateLaw, ReactionRule,
    SeedSpecies, SimulationExtras,
};
pub use species::{BondEdge, BondMarker, ComponentDef, ComponentOccurrence, MoleculeInstance, MoleculeType, SiteIndex, Species};

#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum ModelError {
    #[error("duplicate {kind} definition '{name}'")]
    DuplicateDefinition { kind: String, name: String },
    #[error("bond label {label} occurs {occurrences} time(s) in '{pattern}', expected exactly 2")]
    UnpairedBond {
        label: u32,
        occurrences: usize,
        pattern: String,
    },
    #[error("unknown molecule type '{name}' in '{pattern}'")]
    UnknownMoleculeType { name: String, pattern: String },
    #[error("molecule type '{molecule}' has no component '{component}' (in '{pattern}')")]
    UnknownComponent {
        molecule: String,
        component: String,
        pattern: String,
    },
    #[error("state '{state}' is not allowed for {molecule}({component})")]
    InvalidState {
        molecule: String,
        component: String,
        state: String,
    },
    #[error("compartment '{name}' is referenced but never declared")]
    UndeclaredCompartment { name: String },
    #[error("compartment hierarchy contains a cycle through '{name}'")]
    CompartmentCycle { name: String },
    #[error("action of rule '{rule}' refers to missing site {site}")]
    UnresolvedActionSite { rule: String, site: String },
    #[error("invalid {what}: {detail}")]
    Invalid { what: String, detail: String },
}

impl ModelError {
    pub fn duplicate(kind: &str, name: &str) -> Self {
        ModelError::DuplicateDefinition {
            kind: kind.to_string(),
            name: name.to_string(),
        }
    }
}
