//! `Network`: the Pattern Model instance owned by one translation run.
use super::ModelError;
use super::actions::{Action, MapItem, Side};
use super::species::{MoleculeType, Species};
use log::warn;
use prettytable::{Table, row};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RateLaw {
    Irreversible(String),
    Reversible { forward: String, backward: String },
}

impl RateLaw {
    pub fn from_rates(rates: &[String]) -> Result<Self, ModelError> {
        match rates {
            [k] => Ok(RateLaw::Irreversible(k.clone())),
            [f, b] => Ok(RateLaw::Reversible {
                forward: f.clone(),
                backward: b.clone(),
            }),
            _ => Err(ModelError::Invalid {
                what: "rate law".to_string(),
                detail: format!("expected 1 or 2 rate expressions, got {}", rates.len()),
            }),
        }
    }

    pub fn is_reversible(&self) -> bool {
        matches!(self, RateLaw::Reversible { .. })
    }

    /// expressions in writing order
    pub fn expressions(&self) -> Vec<&str> {
        match self {
            RateLaw::Irreversible(k) => vec![k],
            RateLaw::Reversible { forward, backward } => vec![forward, backward],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReactionRule {
    pub name: Option<String>,
    pub reactants: Vec<Species>,
    pub products: Vec<Species>,
    pub rate: RateLaw,
    pub actions: Vec<Action>,
    pub mapping: Vec<MapItem>,
}

impl ReactionRule {
    /// name used in messages: the rule name or its 1-based position
    pub fn label(&self, index: usize) -> String {
        self.name.clone().unwrap_or_else(|| format!("_R{}", index + 1))
    }

    /// every action site must point at a component occurrence (or molecule) of the rule
    pub fn check_action_sites(&self, index: usize) -> Result<(), ModelError> {
        for action in &self.actions {
            for site in action.sites() {
                let patterns = match site.side {
                    Side::Reactant => &self.reactants,
                    Side::Product => &self.products,
                };
                let molecule = patterns
                    .get(site.pattern)
                    .and_then(|s| s.molecules().get(site.molecule));
                let resolved = match (molecule, site.component) {
                    (Some(m), Some(c)) => c < m.components.len(),
                    (Some(_), None) => true,
                    (None, _) => false,
                };
                if !resolved {
                    return Err(ModelError::UnresolvedActionSite {
                        rule: self.label(index),
                        site: site.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// `A(x) + B(y) -> A(x!1).B(y!1)` without rate
    pub fn equation(&self) -> String {
        let side = |patterns: &[Species]| {
            patterns
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(" + ")
        };
        let arrow = if self.rate.is_reversible() { "<->" } else { "->" };
        format!("{} {} {}", side(&self.reactants), arrow, side(&self.products))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Compartment {
    pub name: String,
    /// 2 = surface, 3 = volume
    pub dimensions: u8,
    pub size: String,
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ObservableKind {
    Molecules,
    Species,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observable {
    pub kind: ObservableKind,
    pub name: String,
    pub patterns: Vec<Species>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub expr: String,
    /// names of other parameters the expression refers to, when known
    pub depends_on: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Function {
    pub name: String,
    pub args: Vec<String>,
    pub expr: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeedSpecies {
    /// `S1`, `S2`, ... in declaration order
    pub id: String,
    pub species: Species,
    pub amount: String,
}

/// Diffusion metadata of one molecule type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diffusion {
    pub dimensions: u8,
    pub constant: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneObject {
    pub name: String,
    pub geometry: String,
    pub raw_body: String,
}

/// How a seed is placed in the simulation scene.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ReleaseInfo {
    pub site_name: String,
    pub shape: Option<String>,
    /// `NUMBER_TO_RELEASE`, `CONCENTRATION` or `DENSITY`
    pub quantity_key: String,
    pub probability: Option<String>,
}

/// Model-description settings with no rule-language counterpart.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SimulationExtras {
    /// top-level `KEY = value` statements in source order
    pub statements: Vec<(String, String)>,
    pub diffusion: BTreeMap<String, Diffusion>,
    pub surface_classes: Option<String>,
    pub surface_regions: Option<String>,
    /// uninterpreted `HEADER { ... }` sections (geometry and the like)
    pub generic_sections: Vec<(String, String)>,
    pub scene_name: Option<String>,
    pub scene_objects: Vec<SceneObject>,
    /// seed id -> release settings
    pub releases: BTreeMap<String, ReleaseInfo>,
    pub output_step: Option<String>,
    /// observable name -> output file
    pub observable_paths: BTreeMap<String, String>,
}

impl SimulationExtras {
    pub fn statement(&self, key: &str) -> Option<&str> {
        self.statements
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Network {
    pub molecule_types: Vec<MoleculeType>,
    pub parameters: Vec<Parameter>,
    pub compartments: Vec<Compartment>,
    pub seeds: Vec<SeedSpecies>,
    pub observables: Vec<Observable>,
    pub functions: Vec<Function>,
    pub rules: Vec<ReactionRule>,
    pub extras: SimulationExtras,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_molecule_type(&mut self, molecule_type: MoleculeType) -> Result<(), ModelError> {
        if self.molecule_type(&molecule_type.name).is_some() {
            return Err(ModelError::duplicate("molecule type", &molecule_type.name));
        }
        self.molecule_types.push(molecule_type);
        Ok(())
    }

    pub fn add_parameter(&mut self, parameter: Parameter) -> Result<(), ModelError> {
        if self.parameters.iter().any(|p| p.name == parameter.name) {
            return Err(ModelError::duplicate("parameter", &parameter.name));
        }
        self.parameters.push(parameter);
        Ok(())
    }

    pub fn add_compartment(&mut self, compartment: Compartment) -> Result<(), ModelError> {
        if self.compartment(&compartment.name).is_some() {
            return Err(ModelError::duplicate("compartment", &compartment.name));
        }
        self.compartments.push(compartment);
        Ok(())
    }

    pub fn add_observable(&mut self, observable: Observable) -> Result<(), ModelError> {
        if self.observables.iter().any(|o| o.name == observable.name) {
            return Err(ModelError::duplicate("observable", &observable.name));
        }
        self.observables.push(observable);
        Ok(())
    }

    pub fn add_function(&mut self, function: Function) -> Result<(), ModelError> {
        if self.functions.iter().any(|f| f.name == function.name) {
            return Err(ModelError::duplicate("function", &function.name));
        }
        self.functions.push(function);
        Ok(())
    }

    /// assigns the next `S<n>` id and returns it
    pub fn add_seed(&mut self, species: Species, amount: &str) -> String {
        let id = format!("S{}", self.seeds.len() + 1);
        self.seeds.push(SeedSpecies {
            id: id.clone(),
            species,
            amount: amount.to_string(),
        });
        id
    }

    pub fn add_rule(&mut self, rule: ReactionRule) -> Result<(), ModelError> {
        if let Some(name) = &rule.name {
            if self.rules.iter().any(|r| r.name.as_ref() == Some(name)) {
                return Err(ModelError::duplicate("reaction rule", name));
            }
        }
        self.rules.push(rule);
        Ok(())
    }

    pub fn molecule_type(&self, name: &str) -> Option<&MoleculeType> {
        self.molecule_types.iter().find(|m| m.name == name)
    }

    pub fn compartment(&self, name: &str) -> Option<&Compartment> {
        self.compartments.iter().find(|c| c.name == name)
    }

    pub fn seed(&self, id: &str) -> Option<&SeedSpecies> {
        self.seeds.iter().find(|s| s.id == id)
    }

    /// Compartments with every parent before its children; declaration order otherwise.
    pub fn compartments_parent_first(&self) -> Result<Vec<&Compartment>, ModelError> {
        for c in &self.compartments {
            if let Some(parent) = &c.parent {
                if self.compartment(parent).is_none() {
                    return Err(ModelError::UndeclaredCompartment {
                        name: parent.clone(),
                    });
                }
            }
        }
        let mut placed: BTreeSet<&str> = BTreeSet::new();
        let mut ordered = Vec::with_capacity(self.compartments.len());
        while ordered.len() < self.compartments.len() {
            let before = ordered.len();
            for c in &self.compartments {
                if placed.contains(c.name.as_str()) {
                    continue;
                }
                let ready = match &c.parent {
                    None => true,
                    Some(parent) => placed.contains(parent.as_str()),
                };
                if ready {
                    placed.insert(c.name.as_str());
                    ordered.push(c);
                }
            }
            if ordered.len() == before {
                let stuck = self
                    .compartments
                    .iter()
                    .find(|c| !placed.contains(c.name.as_str()))
                    .map(|c| c.name.clone())
                    .unwrap_or_default();
                return Err(ModelError::CompartmentCycle { name: stuck });
            }
        }
        Ok(ordered)
    }

    /// Parameters in dependency order when every parameter carries dependency metadata,
    /// declaration order otherwise. Ties keep declaration order.
    pub fn parameters_in_dependency_order(&self) -> Vec<&Parameter> {
        if self.parameters.iter().any(|p| p.depends_on.is_none()) {
            return self.parameters.iter().collect();
        }
        let known: BTreeSet<&str> = self.parameters.iter().map(|p| p.name.as_str()).collect();
        let mut placed: BTreeSet<&str> = BTreeSet::new();
        let mut ordered = Vec::with_capacity(self.parameters.len());
        while ordered.len() < self.parameters.len() {
            let next = self.parameters.iter().find(|p| {
                !placed.contains(p.name.as_str())
                    && p.depends_on.iter().flatten().all(|d| {
                        d == &p.name || !known.contains(d.as_str()) || placed.contains(d.as_str())
                    })
            });
            match next {
                Some(p) => {
                    placed.insert(p.name.as_str());
                    ordered.push(p);
                }
                None => {
                    warn!("parameter dependencies are circular; keeping declaration order for the rest");
                    for p in &self.parameters {
                        if !placed.contains(p.name.as_str()) {
                            placed.insert(p.name.as_str());
                            ordered.push(p);
                        }
                    }
                }
            }
        }
        ordered
    }

    /// Surface molecules are declared with 2D diffusion or appear in a 2D compartment.
    pub fn is_surface_molecule(&self, name: &str) -> bool {
        if let Some(d) = self.extras.diffusion.get(name) {
            return d.dimensions == 2;
        }
        self.all_species().any(|s| {
            s.molecules().iter().any(|m| {
                m.type_name == name
                    && m.compartment
                        .as_deref()
                        .or(s.compartment())
                        .and_then(|c| self.compartment(c))
                        .is_some_and(|c| c.dimensions == 2)
            })
        })
    }

    pub fn is_surface_species(&self, species: &Species) -> bool {
        species
            .molecules()
            .iter()
            .any(|m| self.is_surface_molecule(&m.type_name))
    }

    fn all_species(&self) -> impl Iterator<Item = &Species> {
        self.seeds
            .iter()
            .map(|s| &s.species)
            .chain(self.observables.iter().flat_map(|o| o.patterns.iter()))
            .chain(
                self.rules
                    .iter()
                    .flat_map(|r| r.reactants.iter().chain(r.products.iter())),
            )
    }

    /// Structural checks across the whole model.
    pub fn validate(&self) -> Result<(), ModelError> {
        self.compartments_parent_first()?;
        for species in self.all_species() {
            self.check_species(species)?;
        }
        for (i, rule) in self.rules.iter().enumerate() {
            rule.check_action_sites(i)?;
        }
        for m in &self.molecule_types {
            let in_surface = self.seeds.iter().any(|s| {
                s.species.molecules().iter().any(|mi| {
                    mi.type_name == m.name
                        && mi
                            .compartment
                            .as_deref()
                            .or(s.species.compartment())
                            .and_then(|c| self.compartment(c))
                            .is_some_and(|c| c.dimensions == 2)
                })
            });
            if in_surface && self.extras.diffusion.get(&m.name).is_some_and(|d| d.dimensions == 3) {
                warn!("molecule type '{}' is seeded on a surface but diffuses in 3D", m.name);
            }
        }
        Ok(())
    }

    fn check_species(&self, species: &Species) -> Result<(), ModelError> {
        let check_compartment = |name: &str| {
            if self.compartments.is_empty() || self.compartment(name).is_some() {
                Ok(())
            } else {
                Err(ModelError::UndeclaredCompartment {
                    name: name.to_string(),
                })
            }
        };
        for c in species.compartments() {
            check_compartment(c)?;
        }
        for m in species.molecules() {
            let Some(mt) = self.molecule_type(&m.type_name) else {
                return Err(ModelError::UnknownMoleculeType {
                    name: m.type_name.clone(),
                    pattern: species.to_string(),
                });
            };
            let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
            for occ in &m.components {
                let defs = mt.components_named(&occ.name);
                let n = seen.entry(occ.name.as_str()).or_insert(0);
                *n += 1;
                if defs.len() < *n {
                    return Err(ModelError::UnknownComponent {
                        molecule: mt.name.clone(),
                        component: occ.name.clone(),
                        pattern: species.to_string(),
                    });
                }
                if let Some(state) = &occ.state {
                    let def = defs[*n - 1];
                    if state != "?" && !def.states.contains(state) {
                        return Err(ModelError::InvalidState {
                            molecule: mt.name.clone(),
                            component: occ.name.clone(),
                            state: state.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Attaches simulation settings (usually those of the source file).
    pub fn with_extras(mut self, extras: SimulationExtras) -> Self {
        self.extras = extras;
        self
    }

    /// Summary tables of the model.
    pub fn pretty_print(&self) -> String {
        let mut out = String::new();

        let mut types = Table::new();
        types.add_row(row!["Molecule type", "Surface"]);
        for m in &self.molecule_types {
            types.add_row(row![m.to_string(), self.is_surface_molecule(&m.name)]);
        }
        out.push_str(&types.to_string());

        if !self.compartments.is_empty() {
            let mut comps = Table::new();
            comps.add_row(row!["Compartment", "Dims", "Size", "Parent"]);
            for c in &self.compartments {
                comps.add_row(row![c.name, c.dimensions, c.size, c.parent.clone().unwrap_or_default()]);
            }
            out.push_str(&comps.to_string());
        }

        let mut seeds = Table::new();
        seeds.add_row(row!["Id", "Seed species", "Amount"]);
        for s in &self.seeds {
            seeds.add_row(row![s.id, s.species.to_string(), s.amount]);
        }
        out.push_str(&seeds.to_string());

        let mut rules = Table::new();
        rules.add_row(row!["Rule", "Equation", "Rate", "Actions"]);
        for (i, r) in self.rules.iter().enumerate() {
            let actions = r
                .actions
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join("\n");
            rules.add_row(row![r.label(i), r.equation(), r.rate.expressions().join(", "), actions]);
        }
        out.push_str(&rules.to_string());

        if !self.observables.is_empty() {
            let mut obs = Table::new();
            obs.add_row(row!["Observable", "Kind", "Patterns"]);
            for o in &self.observables {
                let patterns = o
                    .patterns
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                obs.add_row(row![o.name, format!("{:?}", o.kind), patterns]);
            }
            out.push_str(&obs.to_string());
        }
        out
    }
}
