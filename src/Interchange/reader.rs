//! Interchange document -> `Network`.
use super::InterchangeError;
use super::xml_tree::{XmlElement, parse_xml};
use crate::PatternModel::{
    Action, BondMarker, Compartment, ComponentDef, ComponentOccurrence, Function, MapItem,
    MoleculeInstance, MoleculeType, Network, Observable, ObservableKind, Parameter, PatternSite,
    RateLaw, ReactionRule, SeedSpecies, Side, Species,
};
use log::{info, warn};
use std::collections::BTreeMap;

/// Reads a complete document.
pub fn read_network(doc: &str) -> Result<Network, InterchangeError> {
    let root = parse_xml(doc)?;
    let model = model_element(&root)?;
    let species = model
        .child("ListOfSpecies")
        .ok_or_else(|| InterchangeError::malformed("ListOfSpecies"))?;
    build(model, species)
}

/// Reads a document whose species list was split out, together with that fragment.
pub fn read_network_parts(rest: &str, fragment: &str) -> Result<Network, InterchangeError> {
    let root = parse_xml(rest)?;
    let model = model_element(&root)?;
    if let Some(placeholder) = model.child("ListOfSpecies") {
        if !placeholder.children.is_empty() {
            warn!("species placeholder is not empty; using the separate species fragment instead");
        }
    }
    let fragment_root = parse_xml(fragment)?;
    let species = fragment_root
        .find("ListOfSpecies")
        .ok_or_else(|| InterchangeError::malformed("ListOfSpecies (species fragment)"))?;
    build(model, species)
}

fn model_element(root: &XmlElement) -> Result<&XmlElement, InterchangeError> {
    root.find("model")
        .ok_or_else(|| InterchangeError::malformed("model"))
}

fn build(model: &XmlElement, species_list: &XmlElement) -> Result<Network, InterchangeError> {
    let mut network = Network::new();

    if let Some(list) = model.child("ListOfParameters") {
        for p in list.children_named("Parameter") {
            network.add_parameter(Parameter {
                name: p.required_attr("id")?.to_string(),
                expr: p.required_attr("value")?.to_string(),
                depends_on: None,
            })?;
        }
    }

    let types = model
        .child("ListOfMoleculeTypes")
        .ok_or_else(|| InterchangeError::malformed("ListOfMoleculeTypes"))?;
    for mt in types.children_named("MoleculeType") {
        network.add_molecule_type(molecule_type(mt)?)?;
    }

    if let Some(list) = model.child("ListOfCompartments") {
        for c in list.children_named("compartment") {
            let dims = c.required_attr("spatialDimensions")?;
            let dimensions = match dims.trim() {
                "2" => 2,
                "3" => 3,
                other => {
                    return Err(InterchangeError::malformed(&format!(
                        "compartment '{}' has spatialDimensions {}",
                        c.attr("id").unwrap_or("?"),
                        other
                    )));
                }
            };
            network.add_compartment(Compartment {
                name: c.required_attr("id")?.to_string(),
                dimensions,
                size: c.attr("size").unwrap_or("1").to_string(),
                parent: c.attr("outside").filter(|o| !o.is_empty()).map(|o| o.to_string()),
            })?;
        }
    }

    network.seeds = read_species_list(species_list)?;

    let rules = model
        .child("ListOfReactionRules")
        .ok_or_else(|| InterchangeError::malformed("ListOfReactionRules"))?;
    for rr in rules.children_named("ReactionRule") {
        network.add_rule(reaction_rule(rr)?)?;
    }

    if let Some(list) = model.child("ListOfObservables") {
        for o in list.children_named("Observable") {
            let kind = match o.attr("type").unwrap_or("Molecules") {
                "Species" => ObservableKind::Species,
                _ => ObservableKind::Molecules,
            };
            let mut patterns = Vec::new();
            if let Some(list) = o.child("ListOfPatterns") {
                for p in list.children_named("Pattern") {
                    patterns.push(pattern(p)?.species);
                }
            }
            network.add_observable(Observable {
                kind,
                name: o.required_attr("name")?.to_string(),
                patterns,
            })?;
        }
    }

    if let Some(list) = model.child("ListOfFunctions") {
        for f in list.children_named("Function") {
            let expr = f
                .child("Expression")
                .map(|e| e.text.trim().to_string())
                .ok_or_else(|| InterchangeError::malformed("Function without Expression"))?;
            let args = f
                .child("ListOfArguments")
                .map(|l| {
                    l.children_named("Argument")
                        .filter_map(|a| a.attr("id").map(|s| s.to_string()))
                        .collect()
                })
                .unwrap_or_default();
            network.add_function(Function {
                name: f.required_attr("id")?.to_string(),
                args,
                expr,
            })?;
        }
    }

    network.validate()?;
    info!(
        "interchange: {} molecule types, {} species, {} rules",
        network.molecule_types.len(),
        network.seeds.len(),
        network.rules.len()
    );
    Ok(network)
}

fn molecule_type(mt: &XmlElement) -> Result<MoleculeType, InterchangeError> {
    let mut components = Vec::new();
    if let Some(list) = mt.child("ListOfComponentTypes") {
        for ct in list.children_named("ComponentType") {
            let states = ct
                .child("ListOfAllowedStates")
                .map(|l| {
                    l.children_named("AllowedState")
                        .filter_map(|s| s.attr("id").map(|s| s.to_string()))
                        .collect()
                })
                .unwrap_or_default();
            components.push(ComponentDef {
                name: ct.required_attr("id")?.to_string(),
                states,
            });
        }
    }
    Ok(MoleculeType::new(mt.required_attr("id")?, components))
}

/// Seed species of a `ListOfSpecies` element, ids and amounts as written.
pub fn read_species_list(list: &XmlElement) -> Result<Vec<SeedSpecies>, InterchangeError> {
    let mut seeds = Vec::new();
    for s in list.children_named("Species") {
        let read = pattern(s)?;
        seeds.push(SeedSpecies {
            id: s.required_attr("id")?.to_string(),
            species: read.species,
            amount: s.attr("concentration").unwrap_or("0").to_string(),
        });
    }
    Ok(seeds)
}

/// A pattern (or species) plus the element ids it defines, relative to the pattern.
struct ReadPattern {
    species: Species,
    /// id -> (molecule, component)
    ids: BTreeMap<String, (usize, Option<usize>)>,
}

fn pattern(el: &XmlElement) -> Result<ReadPattern, InterchangeError> {
    let mut ids = BTreeMap::new();
    let mut raw: Vec<(String, Vec<(String, Option<String>, String)>, Option<String>)> = Vec::new();
    if let Some(list) = el.child("ListOfMolecules") {
        for (m, mol) in list.children_named("Molecule").enumerate() {
            if let Some(id) = mol.attr("id") {
                ids.insert(id.to_string(), (m, None));
            }
            let mut comps = Vec::new();
            if let Some(clist) = mol.child("ListOfComponents") {
                for (c, comp) in clist.children_named("Component").enumerate() {
                    let id = comp.required_attr("id")?;
                    ids.insert(id.to_string(), (m, Some(c)));
                    comps.push((
                        comp.required_attr("name")?.to_string(),
                        comp.attr("state").map(|s| s.to_string()),
                        comp.attr("numberOfBonds").unwrap_or("0").to_string(),
                    ));
                }
            }
            raw.push((
                mol.required_attr("name")?.to_string(),
                comps,
                mol.attr("compartment").map(|s| s.to_string()),
            ));
        }
    }

    // bonds are labelled 1, 2, ... in document order
    let mut labels: BTreeMap<(usize, usize), u32> = BTreeMap::new();
    if let Some(list) = el.child("ListOfBonds") {
        for (i, bond) in list.children_named("Bond").enumerate() {
            let label = i as u32 + 1;
            for key in ["site1", "site2"] {
                let site = bond.required_attr(key)?;
                match ids.get(site) {
                    Some((m, Some(c))) => {
                        labels.insert((*m, *c), label);
                    }
                    _ => {
                        return Err(InterchangeError::malformed(&format!(
                            "Bond refers to unknown component '{}'",
                            site
                        )));
                    }
                }
            }
        }
    }

    let mut molecules = Vec::with_capacity(raw.len());
    for (m, (name, comps, compartment)) in raw.into_iter().enumerate() {
        let components = comps
            .into_iter()
            .enumerate()
            .map(|(c, (cname, state, bonds))| {
                let bond = match (labels.get(&(m, c)), bonds.as_str()) {
                    (Some(label), _) => BondMarker::Label(*label),
                    (None, "+") => BondMarker::AnyBound,
                    (None, "?") => BondMarker::Any,
                    _ => BondMarker::Unbound,
                };
                ComponentOccurrence::new(&cname, state.as_deref(), bond)
            })
            .collect();
        let mut instance = MoleculeInstance::new(&name, components);
        if let Some(c) = compartment {
            instance = instance.in_compartment(&c);
        }
        molecules.push(instance);
    }
    let compartment = el.attr("compartment").map(|s| s.to_string());
    Ok(ReadPattern {
        species: Species::new(molecules, compartment)?,
        ids,
    })
}

fn reaction_rule(rr: &XmlElement) -> Result<ReactionRule, InterchangeError> {
    let rule_id = rr.required_attr("id")?;
    // element id -> site
    let mut sites: BTreeMap<String, PatternSite> = BTreeMap::new();
    let mut read_side = |list_name: &str, item: &str, side: Side| -> Result<Vec<Species>, InterchangeError> {
        let mut patterns = Vec::new();
        if let Some(list) = rr.child(list_name) {
            for (p, el) in list.children_named(item).enumerate() {
                let read = pattern(el)?;
                if let Some(id) = el.attr("id") {
                    sites.insert(id.to_string(), PatternSite::molecule(side, p, 0));
                }
                for (id, (m, c)) in read.ids {
                    let site = match c {
                        Some(c) => PatternSite::component(side, p, m, c),
                        None => PatternSite::molecule(side, p, m),
                    };
                    sites.insert(id, site);
                }
                patterns.push(read.species);
            }
        }
        Ok(patterns)
    };
    let reactants = read_side("ListOfReactantPatterns", "ReactantPattern", Side::Reactant)?;
    let products = read_side("ListOfProductPatterns", "ProductPattern", Side::Product)?;

    let resolve = |id: &str| -> Result<PatternSite, InterchangeError> {
        sites.get(id).copied().ok_or_else(|| {
            InterchangeError::malformed(&format!("ReactionRule {} refers to unknown id '{}'", rule_id, id))
        })
    };
    let pattern_ids: Vec<&str> = ["ListOfReactantPatterns", "ListOfProductPatterns"]
        .iter()
        .filter_map(|l| rr.child(l))
        .flat_map(|l| l.children.iter())
        .filter_map(|p| p.attr("id"))
        .collect();

    let mut actions = Vec::new();
    if let Some(ops) = rr.child("ListOfOperations") {
        for op in &ops.children {
            let action = match op.name.as_str() {
                "AddBond" => Action::AddBond {
                    a: resolve(op.required_attr("site1")?)?,
                    b: resolve(op.required_attr("site2")?)?,
                },
                "DeleteBond" => Action::DeleteBond {
                    a: resolve(op.required_attr("site1")?)?,
                    b: resolve(op.required_attr("site2")?)?,
                },
                "StateChange" => Action::StateChange {
                    site: resolve(op.required_attr("site")?)?,
                    final_state: op.required_attr("finalState")?.to_string(),
                },
                "Add" => Action::Create {
                    molecule: resolve(op.required_attr("id")?)?,
                },
                "Delete" => {
                    let id = op.required_attr("id")?;
                    Action::Destroy {
                        molecule: resolve(id)?,
                        whole_species: pattern_ids.contains(&id)
                            && op.attr("DeleteMolecules").unwrap_or("0") == "0",
                    }
                }
                other => {
                    warn!("rule {}: skipping unknown operation {}", rule_id, other);
                    continue;
                }
            };
            actions.push(action);
        }
    }

    let mut mapping = Vec::new();
    if let Some(map) = rr.child("Map") {
        for item in map.children_named("MapItem") {
            let source = resolve(item.required_attr("sourceID")?)?;
            let target = match item.attr("targetID") {
                Some(t) if !t.is_empty() && t != "Null" => Some(resolve(t)?),
                _ => None,
            };
            mapping.push(MapItem { source, target });
        }
    }

    let law = rr
        .child("RateLaw")
        .ok_or_else(|| InterchangeError::malformed(&format!("ReactionRule {} without RateLaw", rule_id)))?;
    let constants: Vec<String> = law
        .child("ListOfRateConstants")
        .map(|l| {
            l.children_named("RateConstant")
                .filter_map(|k| k.attr("value").map(|v| v.to_string()))
                .collect()
        })
        .unwrap_or_default();
    let rate = match (constants.first(), law.attr("name")) {
        (Some(k), _) => RateLaw::Irreversible(k.clone()),
        (None, Some(name)) => RateLaw::Irreversible(name.to_string()),
        (None, None) => {
            return Err(InterchangeError::malformed(&format!(
                "RateLaw of ReactionRule {} has no rate constant",
                rule_id
            )));
        }
    };

    Ok(ReactionRule {
        name: rr.attr("name").map(|s| s.to_string()),
        reactants,
        products,
        rate,
        actions,
        mapping,
    })
}
