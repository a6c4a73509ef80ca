//! # Grammar Module
//!
//! ## Purpose
//! Turns model text into a typed section tree. Two surface syntaxes are understood:
//! - the extended model-description language (`DEFINE_MOLECULES`, `DEFINE_REACTIONS`,
//!   `INSTANTIATE`, `REACTION_DATA_OUTPUT`, ... plus graph-pattern reaction rules)
//! - the rule-language text format (`begin parameters` ... `end reaction rules`)
//!
//! ## Main Data Structures
//! - `SectionTree`: sections in source order, one `Section` variant per section kind
//! - `SpeciesAst` / `MoleculeAst` / `ComponentAst` / `BondAst`: molecule-pattern syntax
//! - `GrammarError`: message plus the offending span and text
//!
//! ## Pattern syntax
//! ```text
//! Name(comp1~state1!bond1,comp2)@Compartment
//! !<integer>  bound, labeled
//! !+          bound, partner unknown
//! !?          any bond state
//! (nothing)   unbound
//! ```
//! Species join molecules with `.`, rules join species with `+` and separate sides with
//! `->` or `<->`, followed by `[rate]` / `[fwd,bkwd]` (model description) or a trailing
//! `rate` / `fwd, bkwd` (rule language).
//!
//! ## Errors
//! Parsing stops at the first structural problem (unterminated brace, malformed bond,
//! rule without rate). There is no partial recovery.
//!
//! ## Usage
//! ```rust, ignore
//! use KiRuleNet::Grammar::parse_model_description;
//! let tree = parse_model_description(&std::fs::read_to_string("model.mdlr")?)?;
//! for section in &tree.sections {
//!     println!("{}", section.name());
//! }
//! ```
use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub mod ast;
pub mod bngl_parser;
pub mod lexer;
pub mod mdlr_parser;
pub mod pattern;

mod grammar_tests;

pub use ast::{Section, SectionTree};
pub use bngl_parser::parse_rule_language;
pub use lexer::Span;
pub use mdlr_parser::parse_model_description;

/// Structurally invalid source text.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{location}: {message} (near `{snippet}`)")]
pub struct GrammarError {
    pub message: String,
    pub span: Span,
    pub snippet: String,
    location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Location {
    line: usize,
    column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

impl GrammarError {
    pub fn new(message: &str, span: Span, src: &str) -> Self {
        let end = span.end.min(src.len());
        let start = span.start.min(end);
        let mut snippet = src.get(start..end).unwrap_or("").trim().to_string();
        if snippet.is_empty() {
            snippet = src
                .get(start..)
                .and_then(|rest| rest.lines().next())
                .unwrap_or("")
                .trim()
                .to_string();
        }
        if snippet.chars().count() > 60 {
            snippet = snippet.chars().take(60).collect::<String>() + "...";
        }
        Self {
            message: message.to_string(),
            span,
            snippet,
            location: Location {
                line: span.line,
                column: span.column,
            },
        }
    }
}
