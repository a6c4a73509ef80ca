//! Builds a `Network` from a parsed `SectionTree`.
//!
//! Both surface syntaxes land here. Model-description sections also fill
//! `SimulationExtras`; rule-language sections only touch the core model.
use super::ModelError;
use super::actions::derive_actions;
use super::network::{
    Compartment, Diffusion, Function, Network, Observable, ObservableKind, Parameter, RateLaw,
    ReactionRule, ReleaseInfo, SceneObject,
};
use super::species::{
    BondMarker, ComponentDef, ComponentOccurrence, MoleculeInstance, MoleculeType, Species,
};
use crate::Grammar::ast::{
    Assignment, BondAst, CountKind, ExtensionEntry, InstantiateAst, MoleculeAst, OutputEntry,
    RuleAst, Section, SectionTree, SpeciesAst,
};
use log::{info, warn};
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;

/// top-level statements that configure the simulation engine rather than define parameters
const SIMULATION_KEYWORDS: &[&str] = &[
    "ITERATIONS",
    "TIME_STEP",
    "TIME_STEP_MAX",
    "SPACE_STEP",
    "VACANCY_SEARCH_DISTANCE",
    "INTERACTION_RADIUS",
    "MICROSCOPIC_REVERSIBILITY",
    "SURFACE_GRID_DENSITY",
    "ACCURATE_3D_REACTIONS",
    "CENTER_MOLECULES_ON_GRID",
    "RADIAL_DIRECTIONS",
    "RADIAL_SUBDIVISIONS",
    "EFFECTOR_GRID_DENSITY",
    "COMPLEX_PLACEMENT_ATTEMPTS",
    "INCLUDE_FILE",
    "PARTITION_X",
    "PARTITION_Y",
    "PARTITION_Z",
];

const QUANTITY_KEYS: &[&str] = &["NUMBER_TO_RELEASE", "CONCENTRATION", "DENSITY"];

const IDENTIFIER: &str = r"[A-Za-z_][A-Za-z0-9_]*";

pub fn network_from_sections(tree: &SectionTree) -> Result<Network, ModelError> {
    let mut network = Network::new();
    let identifier = Regex::new(IDENTIFIER).map_err(|e| ModelError::Invalid {
        what: "identifier pattern".to_string(),
        detail: e.to_string(),
    })?;

    for section in &tree.sections {
        match section {
            Section::Statement(a) => {
                if SIMULATION_KEYWORDS.contains(&a.key.as_str()) || !is_expression(&a.value) {
                    network.extras.statements.push((a.key.clone(), a.value.clone()));
                } else {
                    network.add_parameter(parameter(a, &identifier))?;
                }
            }
            Section::Parameters(list) => {
                for a in list {
                    network.add_parameter(parameter(a, &identifier))?;
                }
            }
            Section::DefineMolecules(decls) => {
                for decl in decls {
                    network.add_molecule_type(molecule_type(&decl.molecule)?)?;
                    for p in &decl.properties {
                        if let Some(d) = diffusion(p) {
                            network.extras.diffusion.insert(decl.molecule.name.clone(), d);
                        }
                    }
                }
            }
            Section::MoleculeTypes(list) => {
                for m in list {
                    network.add_molecule_type(molecule_type(m)?)?;
                }
            }
            Section::Extension { name, entries } => {
                if name != "DEFINE_MOLECULES" {
                    warn!("ignoring unknown extension section #{}", name);
                    continue;
                }
                for entry in entries {
                    if let ExtensionEntry::Target { name, properties } = entry {
                        for p in properties {
                            if let Some(d) = diffusion(p) {
                                network.extras.diffusion.insert(name.clone(), d);
                            }
                        }
                    }
                }
            }
            Section::DefineReactions(rules) | Section::ReactionRules(rules) => {
                for r in rules {
                    network.add_rule(rule(r)?)?;
                }
            }
            Section::Compartments(list) => {
                for c in list {
                    network.add_compartment(Compartment {
                        name: c.name.clone(),
                        dimensions: c.dimensions,
                        size: c.size.clone(),
                        parent: c.parent.clone(),
                    })?;
                }
            }
            Section::SeedSpecies(list) => {
                for seed in list {
                    let species = species(&seed.species)?;
                    network.add_seed(species, &seed.amount);
                }
            }
            Section::Observables(list) => {
                for o in list {
                    network.add_observable(Observable {
                        kind: observable_kind(o.kind),
                        name: o.name.clone(),
                        patterns: o.patterns.iter().map(species).collect::<Result<_, _>>()?,
                    })?;
                }
            }
            Section::Functions(list) => {
                for f in list {
                    network.add_function(Function {
                        name: f.name.clone(),
                        args: f.args.clone(),
                        expr: f.expression.clone(),
                    })?;
                }
            }
            Section::Instantiate(inst) => instantiate(&mut network, inst)?,
            Section::ReactionDataOutput(entries) => {
                for entry in entries {
                    match entry {
                        OutputEntry::Assignment(a) if a.key == "STEP" => {
                            network.extras.output_step = Some(a.value.clone());
                        }
                        OutputEntry::Assignment(a) => {
                            warn!("ignoring output setting {} = {}", a.key, a.value);
                        }
                        OutputEntry::Count {
                            kind,
                            patterns,
                            path,
                            ..
                        } => {
                            let name = Path::new(path)
                                .file_stem()
                                .map(|s| s.to_string_lossy().to_string())
                                .unwrap_or_else(|| path.clone());
                            network.add_observable(Observable {
                                kind: observable_kind(*kind),
                                name: name.clone(),
                                patterns: patterns.iter().map(species).collect::<Result<_, _>>()?,
                            })?;
                            network.extras.observable_paths.insert(name, path.clone());
                        }
                    }
                }
            }
            Section::DefineSurfaceClasses(block) => {
                network.extras.surface_classes = Some(block.raw.trim().to_string());
            }
            Section::ModifySurfaceRegions(block) => {
                network.extras.surface_regions = Some(block.raw.trim().to_string());
            }
            Section::Generic { header, block } => {
                network
                    .extras
                    .generic_sections
                    .push((header.clone(), block.raw.clone()));
            }
        }
    }

    keep_known_dependencies(&mut network);
    network.validate()?;
    info!(
        "pattern model: {} molecule types, {} seeds, {} rules, {} observables",
        network.molecule_types.len(),
        network.seeds.len(),
        network.rules.len(),
        network.observables.len()
    );
    Ok(network)
}

fn parameter(a: &Assignment, identifier: &Regex) -> Parameter {
    let mut deps: Vec<String> = Vec::new();
    for m in identifier.find_iter(&a.value) {
        let name = m.as_str().to_string();
        // exponents such as 1e-5 are matched as `e`
        let preceded_by_digit = a.value[..m.start()]
            .chars()
            .last()
            .is_some_and(|c| c.is_ascii_digit() || c == '.');
        if !preceded_by_digit && !deps.contains(&name) {
            deps.push(name);
        }
    }
    Parameter {
        name: a.key.clone(),
        expr: a.value.clone(),
        depends_on: Some(deps),
    }
}

/// drops references to names that are not parameters (functions, observables, builtins)
fn keep_known_dependencies(network: &mut Network) {
    let names: BTreeSet<String> = network.parameters.iter().map(|p| p.name.clone()).collect();
    for p in &mut network.parameters {
        if let Some(deps) = &mut p.depends_on {
            deps.retain(|d| names.contains(d) && d != &p.name);
        }
    }
}

fn diffusion(p: &Assignment) -> Option<Diffusion> {
    let dimensions = match p.key.as_str() {
        "DIFFUSION_CONSTANT_3D" => 3,
        "DIFFUSION_CONSTANT_2D" => 2,
        _ => return None,
    };
    Some(Diffusion {
        dimensions,
        constant: p.value.clone(),
    })
}

fn observable_kind(kind: CountKind) -> ObservableKind {
    match kind {
        CountKind::Molecules => ObservableKind::Molecules,
        CountKind::Species => ObservableKind::Species,
    }
}

pub fn molecule_type(m: &MoleculeAst) -> Result<MoleculeType, ModelError> {
    let components = m
        .components
        .iter()
        .map(|c| {
            if c.bond != BondAst::Unbound {
                return Err(ModelError::Invalid {
                    what: format!("molecule type '{}'", m.name),
                    detail: format!("component '{}' declares a bond", c.name),
                });
            }
            Ok(ComponentDef {
                name: c.name.clone(),
                states: c.states.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(MoleculeType::new(&m.name, components))
}

pub fn species(ast: &SpeciesAst) -> Result<Species, ModelError> {
    let mut molecules = Vec::with_capacity(ast.molecules.len());
    for m in &ast.molecules {
        let mut components = Vec::with_capacity(m.components.len());
        for c in &m.components {
            if c.states.len() > 1 {
                return Err(ModelError::Invalid {
                    what: format!("pattern '{}'", m.name),
                    detail: format!("component '{}' lists more than one state", c.name),
                });
            }
            let bond = match c.bond {
                BondAst::Unbound => BondMarker::Unbound,
                BondAst::Label(l) => BondMarker::Label(l),
                BondAst::AnyBound => BondMarker::AnyBound,
                BondAst::Any => BondMarker::Any,
            };
            components.push(ComponentOccurrence::new(
                &c.name,
                c.states.first().map(|s| s.as_str()),
                bond,
            ));
        }
        let mut instance = MoleculeInstance::new(&m.name, components);
        if let Some(c) = &m.compartment {
            instance = instance.in_compartment(c);
        }
        molecules.push(instance);
    }
    Species::new(molecules, ast.compartment.clone())
}

fn rule(ast: &RuleAst) -> Result<ReactionRule, ModelError> {
    let reactants = ast.reactants.iter().map(species).collect::<Result<Vec<_>, _>>()?;
    let products = ast.products.iter().map(species).collect::<Result<Vec<_>, _>>()?;
    // the null species only stands for "nothing"
    let reactants: Vec<Species> = reactants.into_iter().filter(|s| !s.is_empty()).collect();
    let products: Vec<Species> = products.into_iter().filter(|s| !s.is_empty()).collect();
    let (actions, mapping) = derive_actions(&reactants, &products);
    Ok(ReactionRule {
        name: ast.name.clone(),
        reactants,
        products,
        rate: RateLaw::from_rates(&ast.rates)?,
        actions,
        mapping,
    })
}

/// Arithmetic over numbers and names; quoted strings and `[[...]]` ranges are not.
fn is_expression(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_.+-*/^(), \t".contains(c))
}

fn property<'a>(properties: &'a [Assignment], key: &str) -> Option<&'a str> {
    properties
        .iter()
        .find(|p| p.key == key)
        .map(|p| p.value.as_str())
}

/// Scene objects carrying `PARENT` or `MEMBRANE`, or named as another object's `PARENT`,
/// become compartments; release sites become seeds.
fn instantiate(network: &mut Network, inst: &InstantiateAst) -> Result<(), ModelError> {
    network.extras.scene_name = Some(inst.name.clone());
    let parents: BTreeSet<&str> = inst
        .objects
        .iter()
        .filter_map(|o| property(&o.properties, "PARENT"))
        .collect();
    let mut declared: Vec<Compartment> = Vec::new();
    for object in &inst.objects {
        network.extras.scene_objects.push(SceneObject {
            name: object.name.clone(),
            geometry: object.geometry.clone(),
            raw_body: object.raw_body.clone(),
        });
        let parent = property(&object.properties, "PARENT").map(|s| s.to_string());
        let membrane = property(&object.properties, "MEMBRANE")
            .and_then(|v| v.split_whitespace().next())
            .map(|s| s.to_string());
        if parent.is_none() && membrane.is_none() && !parents.contains(object.name.as_str()) {
            continue;
        }
        let size = property(&object.properties, "SIZE").unwrap_or("1.0").to_string();
        let volume_parent = match membrane {
            Some(membrane) => {
                declared.push(Compartment {
                    name: membrane.clone(),
                    dimensions: 2,
                    size: property(&object.properties, "MEMBRANE_SIZE")
                        .unwrap_or("1.0")
                        .to_string(),
                    parent: parent.clone(),
                });
                Some(membrane)
            }
            None => parent,
        };
        declared.push(Compartment {
            name: object.name.clone(),
            dimensions: 3,
            size,
            parent: volume_parent,
        });
    }
    let names: Vec<String> = declared.iter().map(|c| c.name.clone()).collect();
    for mut c in declared {
        if let Some(p) = &c.parent {
            if !names.contains(p) && network.compartment(p).is_none() {
                warn!("compartment '{}': parent '{}' is not a compartment, treating it as outermost", c.name, p);
                c.parent = None;
            }
        }
        network.add_compartment(c)?;
    }

    for site in &inst.release_sites {
        let Some(molecule) = &site.molecule else {
            return Err(ModelError::Invalid {
                what: format!("release site '{}'", site.name),
                detail: "no MOLECULE given".to_string(),
            });
        };
        let Some((key, amount)) = QUANTITY_KEYS
            .iter()
            .find_map(|k| property(&site.properties, k).map(|v| (*k, v)))
        else {
            return Err(ModelError::Invalid {
                what: format!("release site '{}'", site.name),
                detail: format!("none of {} given", QUANTITY_KEYS.join(", ")),
            });
        };
        let id = network.add_seed(species(molecule)?, amount);
        network.extras.releases.insert(
            id,
            ReleaseInfo {
                site_name: site.name.clone(),
                shape: property(&site.properties, "SHAPE").map(|s| s.to_string()),
                quantity_key: key.to_string(),
                probability: property(&site.properties, "RELEASE_PROBABILITY").map(|s| s.to_string()),
            },
        );
    }
    Ok(())
}
