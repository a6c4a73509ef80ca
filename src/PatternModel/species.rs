//! Molecule types and species graphs.
//!
//! A `Species` resolves its bond labels to edges once, when it is constructed, and
//! carries the label-to-edge map with it; consumers never re-derive pairing from
//! component order.
use super::ModelError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentDef {
    pub name: String,
    /// empty for a stateless component
    pub states: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoleculeType {
    pub name: String,
    pub components: Vec<ComponentDef>,
}

impl MoleculeType {
    pub fn new(name: &str, components: Vec<ComponentDef>) -> Self {
        Self {
            name: name.to_string(),
            components,
        }
    }

    /// definitions sharing `name`, in declaration order
    pub fn components_named(&self, name: &str) -> Vec<&ComponentDef> {
        self.components.iter().filter(|c| c.name == name).collect()
    }
}

impl fmt::Display for MoleculeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, c) in self.components.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", c.name)?;
            for s in &c.states {
                write!(f, "~{}", s)?;
            }
        }
        write!(f, ")")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum BondMarker {
    Unbound,
    Label(u32),
    /// at least one bond, partner unspecified (`!+`)
    AnyBound,
    /// bond state does not matter (`!?`)
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentOccurrence {
    pub name: String,
    pub state: Option<String>,
    pub bond: BondMarker,
}

impl ComponentOccurrence {
    pub fn new(name: &str, state: Option<&str>, bond: BondMarker) -> Self {
        Self {
            name: name.to_string(),
            state: state.map(|s| s.to_string()),
            bond,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoleculeInstance {
    pub type_name: String,
    pub components: Vec<ComponentOccurrence>,
    pub compartment: Option<String>,
}

impl MoleculeInstance {
    pub fn new(type_name: &str, components: Vec<ComponentOccurrence>) -> Self {
        Self {
            type_name: type_name.to_string(),
            components,
            compartment: None,
        }
    }

    pub fn in_compartment(mut self, compartment: &str) -> Self {
        self.compartment = Some(compartment.to_string());
        self
    }
}

/// Position of a component occurrence inside one species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SiteIndex {
    pub molecule: usize,
    pub component: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BondEdge {
    pub label: u32,
    pub a: SiteIndex,
    pub b: SiteIndex,
}

impl BondEdge {
    pub fn partner_of(&self, site: SiteIndex) -> Option<SiteIndex> {
        if self.a == site {
            Some(self.b)
        } else if self.b == site {
            Some(self.a)
        } else {
            None
        }
    }
}

/// Immutable species (or pattern) graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Species {
    molecules: Vec<MoleculeInstance>,
    compartment: Option<String>,
    bonds: BTreeMap<u32, BondEdge>,
}

impl Species {
    /// Builds the species and pairs its bond labels. Every concrete label must occur on
    /// exactly two component occurrences.
    pub fn new(
        molecules: Vec<MoleculeInstance>,
        compartment: Option<String>,
    ) -> Result<Self, ModelError> {
        let mut sites: BTreeMap<u32, Vec<SiteIndex>> = BTreeMap::new();
        for (m, molecule) in molecules.iter().enumerate() {
            for (c, component) in molecule.components.iter().enumerate() {
                if let BondMarker::Label(label) = component.bond {
                    sites.entry(label).or_default().push(SiteIndex {
                        molecule: m,
                        component: c,
                    });
                }
            }
        }
        let mut bonds = BTreeMap::new();
        for (label, occurrences) in sites {
            match occurrences.as_slice() {
                [a, b] => {
                    bonds.insert(label, BondEdge { label, a: *a, b: *b });
                }
                _ => {
                    let species = Species {
                        molecules,
                        compartment,
                        bonds: BTreeMap::new(),
                    };
                    return Err(ModelError::UnpairedBond {
                        label,
                        occurrences: occurrences.len(),
                        pattern: species.to_string(),
                    });
                }
            }
        }
        Ok(Self {
            molecules,
            compartment,
            bonds,
        })
    }

    /// the null species (`0`)
    pub fn empty() -> Self {
        Self {
            molecules: Vec::new(),
            compartment: None,
            bonds: BTreeMap::new(),
        }
    }

    pub fn molecules(&self) -> &[MoleculeInstance] {
        &self.molecules
    }

    pub fn compartment(&self) -> Option<&str> {
        self.compartment.as_deref()
    }

    pub fn bonds(&self) -> impl Iterator<Item = &BondEdge> {
        self.bonds.values()
    }

    pub fn bond(&self, label: u32) -> Option<&BondEdge> {
        self.bonds.get(&label)
    }

    pub fn is_empty(&self) -> bool {
        self.molecules.is_empty()
    }

    pub fn component(&self, site: SiteIndex) -> Option<&ComponentOccurrence> {
        self.molecules
            .get(site.molecule)
            .and_then(|m| m.components.get(site.component))
    }

    /// partner site of a concretely bonded component
    pub fn partner(&self, site: SiteIndex) -> Option<SiteIndex> {
        match self.component(site)?.bond {
            BondMarker::Label(label) => self.bonds.get(&label)?.partner_of(site),
            _ => None,
        }
    }

    /// molecule type name -> count
    pub fn molecule_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for m in &self.molecules {
            *counts.entry(m.type_name.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// every compartment mentioned at species or molecule level
    pub fn compartments(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.compartment.iter().map(|s| s.as_str()).collect();
        for m in &self.molecules {
            if let Some(c) = &m.compartment {
                if !names.contains(&c.as_str()) {
                    names.push(c);
                }
            }
        }
        names
    }
}

impl fmt::Display for Species {
    /// rule-language pattern text: `@C:A(x~s!1).B(y!1)@D`, `0` for the null species
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.molecules.is_empty() {
            return write!(f, "0");
        }
        if let Some(c) = &self.compartment {
            write!(f, "@{}:", c)?;
        }
        for (i, m) in self.molecules.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}(", m.type_name)?;
            for (j, c) in m.components.iter().enumerate() {
                if j > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}", c.name)?;
                if let Some(s) = &c.state {
                    write!(f, "~{}", s)?;
                }
                match c.bond {
                    BondMarker::Unbound => {}
                    BondMarker::Label(l) => write!(f, "!{}", l)?,
                    BondMarker::AnyBound => write!(f, "!+")?,
                    BondMarker::Any => write!(f, "!?")?,
                }
            }
            write!(f, ")")?;
            if let Some(c) = &m.compartment {
                write!(f, "@{}", c)?;
            }
        }
        Ok(())
    }
}
