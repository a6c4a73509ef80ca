//! Rule actions and the reactant-to-product map.
//!
//! Sites are positional: which side of the rule, which pattern on that side, which
//! molecule inside the pattern and (for bond and state operations) which component.
use super::species::{BondMarker, SiteIndex, Species};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Side {
    Reactant,
    Product,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PatternSite {
    pub side: Side,
    pub pattern: usize,
    pub molecule: usize,
    /// `None` addresses the molecule itself
    pub component: Option<usize>,
}

impl PatternSite {
    pub fn component(side: Side, pattern: usize, molecule: usize, component: usize) -> Self {
        Self {
            side,
            pattern,
            molecule,
            component: Some(component),
        }
    }

    pub fn molecule(side: Side, pattern: usize, molecule: usize) -> Self {
        Self {
            side,
            pattern,
            molecule,
            component: None,
        }
    }

    pub fn index(&self) -> Option<SiteIndex> {
        self.component.map(|component| SiteIndex {
            molecule: self.molecule,
            component,
        })
    }
}

impl fmt::Display for PatternSite {
    /// 1-based `R1.M2.C1` / `P1.M1`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = match self.side {
            Side::Reactant => "R",
            Side::Product => "P",
        };
        write!(f, "{}{}.M{}", side, self.pattern + 1, self.molecule + 1)?;
        if let Some(c) = self.component {
            write!(f, ".C{}", c + 1)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Action {
    AddBond { a: PatternSite, b: PatternSite },
    DeleteBond { a: PatternSite, b: PatternSite },
    StateChange { site: PatternSite, final_state: String },
    /// product molecule with no reactant counterpart
    Create { molecule: PatternSite },
    /// reactant molecule with no product counterpart; `whole_species` removes the
    /// complex it belongs to instead of the molecule alone
    Destroy { molecule: PatternSite, whole_species: bool },
}

impl Action {
    pub fn sites(&self) -> Vec<&PatternSite> {
        match self {
            Action::AddBond { a, b } | Action::DeleteBond { a, b } => vec![a, b],
            Action::StateChange { site, .. } => vec![site],
            Action::Create { molecule } | Action::Destroy { molecule, .. } => vec![molecule],
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Action::AddBond { .. } => "AddBond",
            Action::DeleteBond { .. } => "DeleteBond",
            Action::StateChange { .. } => "StateChange",
            Action::Create { .. } => "Add",
            Action::Destroy { .. } => "Delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::AddBond { a, b } | Action::DeleteBond { a, b } => {
                write!(f, "{}({}, {})", self.kind(), a, b)
            }
            Action::StateChange { site, final_state } => {
                write!(f, "StateChange({} -> {})", site, final_state)
            }
            Action::Create { molecule } => write!(f, "Add({})", molecule),
            Action::Destroy { molecule, whole_species } => {
                write!(f, "Delete({}{})", molecule, if *whole_species { ", species" } else { "" })
            }
        }
    }
}

/// Reactant element and the product element it becomes; `target == None` means it is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MapItem {
    pub source: PatternSite,
    pub target: Option<PatternSite>,
}

/// Derives the actions of a rule written in source text.
///
/// Molecules are matched by type name in order of appearance across each side; within a
/// matched pair the k-th component of a given name maps to the k-th component of the same
/// name. Bonds are compared through that map: a product edge with no reactant counterpart is
/// an `AddBond`, a reactant edge that is gone is a `DeleteBond`. Wildcard markers never
/// produce actions.
pub fn derive_actions(reactants: &[Species], products: &[Species]) -> (Vec<Action>, Vec<MapItem>) {
    let reactant_molecules = flatten(reactants, Side::Reactant);
    let product_molecules = flatten(products, Side::Product);

    // type name -> queue of unmatched product molecules
    let mut pending: BTreeMap<&str, Vec<(PatternSite, &super::species::MoleculeInstance)>> = BTreeMap::new();
    for (site, molecule) in &product_molecules {
        pending.entry(molecule.type_name.as_str()).or_default().push((*site, molecule));
    }
    for queue in pending.values_mut() {
        queue.reverse();
    }

    let mut actions = Vec::new();
    let mut mapping = Vec::new();
    // reactant component site -> product component site
    let mut component_map: BTreeMap<PatternSite, PatternSite> = BTreeMap::new();
    let mut matched_products = Vec::new();

    for (r_site, r_mol) in &reactant_molecules {
        let partner = pending.get_mut(r_mol.type_name.as_str()).and_then(|q| q.pop());
        let Some((p_site, p_mol)) = partner else {
            mapping.push(MapItem {
                source: *r_site,
                target: None,
            });
            actions.push(Action::Destroy {
                molecule: *r_site,
                whole_species: false,
            });
            continue;
        };
        matched_products.push(p_site);
        mapping.push(MapItem {
            source: *r_site,
            target: Some(p_site),
        });
        let mut used = vec![false; p_mol.components.len()];
        for (rc, r_comp) in r_mol.components.iter().enumerate() {
            let found = p_mol
                .components
                .iter()
                .enumerate()
                .find(|(pc, p_comp)| !used[*pc] && p_comp.name == r_comp.name);
            let Some((pc, p_comp)) = found else {
                continue;
            };
            used[pc] = true;
            let rs = PatternSite::component(r_site.side, r_site.pattern, r_site.molecule, rc);
            let ps = PatternSite::component(p_site.side, p_site.pattern, p_site.molecule, pc);
            component_map.insert(rs, ps);
            mapping.push(MapItem {
                source: rs,
                target: Some(ps),
            });
            if let (Some(before), Some(after)) = (&r_comp.state, &p_comp.state) {
                if before != after && after != "?" {
                    actions.push(Action::StateChange {
                        site: rs,
                        final_state: after.clone(),
                    });
                }
            }
        }
    }

    // reactant bonds that are gone
    for (p, species) in reactants.iter().enumerate() {
        for edge in species.bonds() {
            let a = PatternSite::component(Side::Reactant, p, edge.a.molecule, edge.a.component);
            let b = PatternSite::component(Side::Reactant, p, edge.b.molecule, edge.b.component);
            let kept = match (component_map.get(&a), component_map.get(&b)) {
                (Some(pa), Some(pb)) => bonded_in(products, pa, pb),
                _ => false,
            };
            if !kept {
                actions.push(Action::DeleteBond { a, b });
            }
        }
    }

    // product bonds that are new, expressed on reactant sites when both ends are mapped
    let reverse: BTreeMap<PatternSite, PatternSite> = component_map.iter().map(|(r, p)| (*p, *r)).collect();
    for (p, species) in products.iter().enumerate() {
        for edge in species.bonds() {
            let pa = PatternSite::component(Side::Product, p, edge.a.molecule, edge.a.component);
            let pb = PatternSite::component(Side::Product, p, edge.b.molecule, edge.b.component);
            match (reverse.get(&pa), reverse.get(&pb)) {
                (Some(ra), Some(rb)) => {
                    if !bonded_in(reactants, ra, rb) {
                        actions.push(Action::AddBond { a: *ra, b: *rb });
                    }
                }
                _ => actions.push(Action::AddBond { a: pa, b: pb }),
            }
        }
    }

    for (p_site, _) in &product_molecules {
        if !matched_products.contains(p_site) {
            actions.push(Action::Create { molecule: *p_site });
        }
    }
    (actions, mapping)
}

fn flatten(patterns: &[Species], side: Side) -> Vec<(PatternSite, &super::species::MoleculeInstance)> {
    patterns
        .iter()
        .enumerate()
        .flat_map(|(p, species)| {
            species
                .molecules()
                .iter()
                .enumerate()
                .map(move |(m, molecule)| (PatternSite::molecule(side, p, m), molecule))
        })
        .collect()
}

/// true when both sites are in the same pattern and joined by one edge
fn bonded_in(patterns: &[Species], a: &PatternSite, b: &PatternSite) -> bool {
    if a.pattern != b.pattern {
        return false;
    }
    let (Some(species), Some(ia), Some(ib)) = (patterns.get(a.pattern), a.index(), b.index()) else {
        return false;
    };
    match species.component(ia).map(|c| &c.bond) {
        Some(BondMarker::Label(_)) => species.partner(ia) == Some(ib),
        _ => false,
    }
}
