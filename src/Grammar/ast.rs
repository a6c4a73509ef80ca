//! Typed syntax tree for both surface syntaxes.
//!
//! Every section kind has its own variant and every piece of molecule-pattern syntax
//! has its own node, so consumers match on shapes instead of inspecting nested lists.
use super::lexer::Span;
use serde::Serialize;

/// Bond suffix of a component occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BondAst {
    /// no `!` at all
    Unbound,
    /// `!<integer>`
    Label(u32),
    /// `!+`
    AnyBound,
    /// `!?`
    Any,
}

/// `name~state1~state2!bond`. In a molecule type declaration `states` lists the
/// allowed states, in a pattern it holds at most one entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentAst {
    pub name: String,
    pub states: Vec<String>,
    pub bond: BondAst,
    pub span: Span,
}

/// `Name(components)@Compartment`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoleculeAst {
    pub name: String,
    pub components: Vec<ComponentAst>,
    pub compartment: Option<String>,
    pub span: Span,
}

/// Dotted species: `@C:A(x!1).B(y!1)` or `A(x!1)@C.B(y!1)@C`.
/// An empty molecule list is the null species (`0` / `NULL`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesAst {
    pub compartment: Option<String>,
    pub molecules: Vec<MoleculeAst>,
    /// surface orientation mark (`'`) written after the pattern
    pub oriented: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleAst {
    pub name: Option<String>,
    pub reactants: Vec<SpeciesAst>,
    pub products: Vec<SpeciesAst>,
    pub reversible: bool,
    /// one expression for `->`, two for `<->`
    pub rates: Vec<String>,
    pub span: Span,
}

/// `KEY = value`, value kept as written
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub key: String,
    pub value: String,
    pub span: Span,
}

/// One entry of `DEFINE_MOLECULES`, with its optional `{ ... }` property block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoleculeDecl {
    pub molecule: MoleculeAst,
    pub properties: Vec<Assignment>,
}

/// Raw text of a section whose content is not interpreted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenericBlock {
    pub raw: String,
    pub span: Span,
}

/// `<name> OBJECT <geometry> { ... }` inside `INSTANTIATE`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectAst {
    pub name: String,
    pub geometry: String,
    pub properties: Vec<Assignment>,
    pub raw_body: String,
    pub span: Span,
}

/// `<name> RELEASE_SITE { ... }` inside `INSTANTIATE`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReleaseSiteAst {
    pub name: String,
    pub molecule: Option<SpeciesAst>,
    pub properties: Vec<Assignment>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstantiateAst {
    pub name: String,
    pub kind: String,
    pub objects: Vec<ObjectAst>,
    pub release_sites: Vec<ReleaseSiteAst>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CountKind {
    Molecules,
    Species,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum OutputEntry {
    Assignment(Assignment),
    /// `{COUNT[pattern, WORLD] + ...} => "path"`
    Count {
        kind: CountKind,
        patterns: Vec<SpeciesAst>,
        location: String,
        path: String,
        span: Span,
    },
}

/// Entry of a hashed extension section: `Target { KEY = value ... }` or a bare assignment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExtensionEntry {
    Target {
        name: String,
        properties: Vec<Assignment>,
    },
    Assignment(Assignment),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompartmentAst {
    pub name: String,
    pub dimensions: u8,
    pub size: String,
    pub parent: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeedAst {
    pub species: SpeciesAst,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservableAst {
    pub kind: CountKind,
    pub name: String,
    pub patterns: Vec<SpeciesAst>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionAst {
    pub name: String,
    pub args: Vec<String>,
    pub expression: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Section {
    // model-description language
    Statement(Assignment),
    DefineMolecules(Vec<MoleculeDecl>),
    DefineReactions(Vec<RuleAst>),
    Instantiate(InstantiateAst),
    ReactionDataOutput(Vec<OutputEntry>),
    ModifySurfaceRegions(GenericBlock),
    DefineSurfaceClasses(GenericBlock),
    Extension {
        name: String,
        entries: Vec<ExtensionEntry>,
    },
    /// any other `HEADER { ... }` block, e.g. geometry
    Generic {
        header: String,
        block: GenericBlock,
    },
    // rule language
    Parameters(Vec<Assignment>),
    MoleculeTypes(Vec<MoleculeAst>),
    Compartments(Vec<CompartmentAst>),
    SeedSpecies(Vec<SeedAst>),
    Observables(Vec<ObservableAst>),
    Functions(Vec<FunctionAst>),
    ReactionRules(Vec<RuleAst>),
}

impl Section {
    pub fn name(&self) -> String {
        match self {
            Section::Statement(a) => a.key.clone(),
            Section::DefineMolecules(_) => "DEFINE_MOLECULES".to_string(),
            Section::DefineReactions(_) => "DEFINE_REACTIONS".to_string(),
            Section::Instantiate(_) => "INSTANTIATE".to_string(),
            Section::ReactionDataOutput(_) => "REACTION_DATA_OUTPUT".to_string(),
            Section::ModifySurfaceRegions(_) => "MODIFY_SURFACE_REGIONS".to_string(),
            Section::DefineSurfaceClasses(_) => "DEFINE_SURFACE_CLASSES".to_string(),
            Section::Extension { name, .. } => format!("#{}", name),
            Section::Generic { header, .. } => header.clone(),
            Section::Parameters(_) => "parameters".to_string(),
            Section::MoleculeTypes(_) => "molecule types".to_string(),
            Section::Compartments(_) => "compartments".to_string(),
            Section::SeedSpecies(_) => "seed species".to_string(),
            Section::Observables(_) => "observables".to_string(),
            Section::Functions(_) => "functions".to_string(),
            Section::ReactionRules(_) => "reaction rules".to_string(),
        }
    }
}

/// Parsed file: sections in source order. Missing sections are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SectionTree {
    pub sections: Vec<Section>,
}

impl SectionTree {
    /// all sections with the given name, in source order
    pub fn get(&self, name: &str) -> Vec<&Section> {
        self.sections.iter().filter(|s| s.name() == name).collect()
    }

    pub fn section_names(&self) -> Vec<String> {
        self.sections.iter().map(|s| s.name()).collect()
    }
}
