//! In-process canonicalization oracle.
//!
//! ## Algorithm
//! Molecules are the vertices of the species graph. Vertices are coloured by their own
//! attributes (type name, compartment, multiset of component name/state/bond kind) and the
//! colouring is refined by the colours of bonded partners until it is stable. Remaining
//! ties are broken by individualizing each candidate of the first non-singleton cell and
//! refining again; every complete ordering is rendered and the smallest rendering wins.
//! Interchangeable candidates (same attributes and same partners) are tried once.
//!
//! A rendering lists molecules in colour order, components of a molecule sorted by
//! name, state, bond kind and partner position, and renumbers bonds 1, 2, ... in the order
//! they are first written. It encodes the whole graph, so different topologies never
//! share a rendering.
use super::OracleError;
use super::oracle::CanonicalOracle;
use crate::Interchange::reader::read_species_list;
use crate::Interchange::xml_tree::parse_xml;
use crate::Interchange::{InterchangeError, read_network};
use crate::PatternModel::{BondMarker, ComponentOccurrence, Network, SeedSpecies, SiteIndex, Species};
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};

pub const LABEL_PREFIX: &str = "c:";

#[derive(Debug, Clone, Default)]
pub struct NativeOracle {
    network: Option<Network>,
    verbosity: u8,
    submitted: Vec<SeedSpecies>,
}

impl NativeOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// numeric amount of a submitted species; parameter names are looked up in the network
    fn amount(&self, seed: &SeedSpecies) -> f64 {
        if let Ok(v) = seed.amount.trim().parse::<f64>() {
            return v;
        }
        self.network
            .as_ref()
            .and_then(|n| n.parameters.iter().find(|p| p.name == seed.amount.trim()))
            .and_then(|p| p.expr.trim().parse::<f64>().ok())
            .unwrap_or(0.0)
    }
}

impl CanonicalOracle for NativeOracle {
    fn init(&mut self, network_xml: &str, verbosity: u8) -> Result<(), OracleError> {
        let network = read_network(network_xml)?;
        if verbosity > 0 {
            info!(
                "native oracle: network with {} molecule types and {} rules loaded",
                network.molecule_types.len(),
                network.rules.len()
            );
        }
        self.network = Some(network);
        self.verbosity = verbosity;
        self.submitted.clear();
        Ok(())
    }

    fn reset(&mut self) -> Result<(), OracleError> {
        self.submitted.clear();
        Ok(())
    }

    fn init_from_xml(&mut self, species_xml: &str) -> Result<(), OracleError> {
        let Some(network) = &self.network else {
            return Err(OracleError::Unavailable("species submitted before init".to_string()));
        };
        let root = parse_xml(species_xml)?;
        let list = root
            .find("ListOfSpecies")
            .ok_or_else(|| InterchangeError::malformed("ListOfSpecies"))?;
        let seeds = read_species_list(list)?;
        for seed in &seeds {
            for m in seed.species.molecules() {
                if network.molecule_type(&m.type_name).is_none() {
                    warn!("species {} uses undeclared molecule type {}", seed.id, m.type_name);
                }
            }
        }
        self.submitted.extend(seeds);
        Ok(())
    }

    fn query(&mut self, kind: &str) -> Result<Vec<String>, OracleError> {
        if self.network.is_none() {
            return Err(OracleError::Unavailable("query before init".to_string()));
        }
        if kind != "complex" && kind != "species" {
            return Err(OracleError::Unavailable(format!("query kind '{}' is not supported", kind)));
        }
        let mut amounts: BTreeMap<String, f64> = BTreeMap::new();
        for seed in &self.submitted {
            let label = format!("{}{}", LABEL_PREFIX, canonical_string(&seed.species));
            if self.verbosity > 1 {
                debug!("{} -> {}", seed.species, label);
            }
            *amounts.entry(label).or_insert(0.0) += self.amount(seed);
        }
        let mut ranked: Vec<(String, f64)> = amounts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(ranked.into_iter().map(|(label, _)| label).collect())
    }
}

/// Canonical text of a species, independent of molecule and component order.
pub fn canonical_string(species: &Species) -> String {
    if species.is_empty() {
        return "0".to_string();
    }
    let graph = Graph::new(species);
    let start = graph.refine(rank(&graph.base));
    graph.search(start)
}

fn component_key(c: &ComponentOccurrence) -> String {
    let bond = match c.bond {
        BondMarker::Unbound => "",
        BondMarker::Label(_) => "!",
        BondMarker::AnyBound => "!+",
        BondMarker::Any => "!?",
    };
    format!("{}~{}{}", c.name, c.state.as_deref().unwrap_or(""), bond)
}

fn bond_rank(bond: &BondMarker) -> u8 {
    match bond {
        BondMarker::Unbound => 0,
        BondMarker::Label(_) => 1,
        BondMarker::AnyBound => 2,
        BondMarker::Any => 3,
    }
}

/// dense ranks of `keys`, equal keys sharing a rank
fn rank<T: Ord + Clone>(keys: &[T]) -> Vec<usize> {
    let sorted: Vec<T> = keys.iter().cloned().collect::<BTreeSet<T>>().into_iter().collect();
    keys.iter()
        .map(|k| sorted.binary_search(k).unwrap_or(0))
        .collect()
}

fn cell_count(colors: &[usize]) -> usize {
    colors.iter().collect::<BTreeSet<_>>().len()
}

struct Graph<'a> {
    species: &'a Species,
    base: Vec<String>,
    /// (own component key, partner molecule, partner component key), sorted
    links: Vec<Vec<(String, usize, String)>>,
}

impl<'a> Graph<'a> {
    fn new(species: &'a Species) -> Self {
        let mut base = Vec::new();
        let mut links = Vec::new();
        for (m, mol) in species.molecules().iter().enumerate() {
            let mut keys: Vec<String> = mol.components.iter().map(component_key).collect();
            keys.sort();
            base.push(format!(
                "{}@{}|{}",
                mol.type_name,
                mol.compartment.as_deref().unwrap_or(""),
                keys.join(",")
            ));
            let mut own = Vec::new();
            for (c, comp) in mol.components.iter().enumerate() {
                let site = SiteIndex { molecule: m, component: c };
                if let Some(p) = species.partner(site) {
                    if let Some(partner) = species.component(p) {
                        own.push((component_key(comp), p.molecule, component_key(partner)));
                    }
                }
            }
            own.sort();
            links.push(own);
        }
        Self { species, base, links }
    }

    fn refine(&self, mut colors: Vec<usize>) -> Vec<usize> {
        loop {
            let signatures: Vec<(usize, Vec<(&str, usize, &str)>)> = self
                .links
                .iter()
                .enumerate()
                .map(|(m, links)| {
                    let mut seen: Vec<(&str, usize, &str)> = links
                        .iter()
                        .map(|(own, p, other)| (own.as_str(), colors[*p], other.as_str()))
                        .collect();
                    seen.sort();
                    (colors[m], seen)
                })
                .collect();
            let next = rank(&signatures);
            if cell_count(&next) == cell_count(&colors) {
                return next;
            }
            colors = next;
        }
    }

    fn individualize(&self, colors: &[usize], v: usize) -> Vec<usize> {
        let split: Vec<(usize, bool)> = colors.iter().enumerate().map(|(m, c)| (*c, m != v)).collect();
        self.refine(rank(&split))
    }

    fn search(&self, colors: Vec<usize>) -> String {
        let mut counts: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (m, c) in colors.iter().enumerate() {
            counts.entry(*c).or_default().push(m);
        }
        let Some(cell) = counts.into_values().find(|members| members.len() > 1) else {
            let mut order: Vec<usize> = (0..colors.len()).collect();
            order.sort_by_key(|m| colors[*m]);
            return self.render(&order);
        };
        let mut tried = BTreeSet::new();
        let mut best: Option<String> = None;
        for v in cell {
            if !tried.insert((&self.base[v], &self.links[v])) {
                continue;
            }
            let candidate = self.search(self.individualize(&colors, v));
            if best.as_ref().is_none_or(|b| candidate < *b) {
                best = Some(candidate);
            }
        }
        best.unwrap_or_default()
    }

    fn render(&self, order: &[usize]) -> String {
        let mut pos = vec![0; order.len()];
        for (p, m) in order.iter().enumerate() {
            pos[*m] = p;
        }
        let mut labels: BTreeMap<u32, usize> = BTreeMap::new();
        let mut next = 1;
        let mut out = String::new();
        if let Some(c) = self.species.compartment() {
            out.push_str(&format!("@{}:", c));
        }
        for (p, m) in order.iter().enumerate() {
            let mol = &self.species.molecules()[*m];
            let mut comps: Vec<(usize, (String, String, u8, usize, usize, String))> = mol
                .components
                .iter()
                .enumerate()
                .map(|(c, comp)| {
                    let partner = self.species.partner(SiteIndex { molecule: *m, component: c });
                    let assigned = match comp.bond {
                        BondMarker::Label(l) => labels.get(&l).copied().unwrap_or(usize::MAX),
                        _ => usize::MAX,
                    };
                    let key = (
                        comp.name.clone(),
                        comp.state.clone().unwrap_or_default(),
                        bond_rank(&comp.bond),
                        partner.map(|s| pos[s.molecule]).unwrap_or(usize::MAX),
                        assigned,
                        partner
                            .and_then(|s| self.species.component(s))
                            .map(component_key)
                            .unwrap_or_default(),
                    );
                    (c, key)
                })
                .collect();
            comps.sort_by(|a, b| a.1.cmp(&b.1));

            if p > 0 {
                out.push('.');
            }
            out.push_str(&mol.type_name);
            out.push('(');
            for (i, (c, _)) in comps.iter().enumerate() {
                let comp = &mol.components[*c];
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&comp.name);
                if let Some(s) = &comp.state {
                    out.push('~');
                    out.push_str(s);
                }
                match comp.bond {
                    BondMarker::Unbound => {}
                    BondMarker::Label(l) => {
                        let n = *labels.entry(l).or_insert_with(|| {
                            let n = next;
                            next += 1;
                            n
                        });
                        out.push_str(&format!("!{}", n));
                    }
                    BondMarker::AnyBound => out.push_str("!+"),
                    BondMarker::Any => out.push_str("!?"),
                }
            }
            out.push(')');
            if let Some(c) = &mol.compartment {
                out.push('@');
                out.push_str(c);
            }
        }
        out
    }
}
