//! `Network` -> interchange document, in the layout the reader expects.
//!
//! Reversible rules are written the way the expansion tool writes them: a forward rule
//! and a `_reverse_` rule with both sides swapped.
use super::InterchangeError;
use super::xml_tree::XmlElement;
use crate::PatternModel::actions::derive_actions;
use crate::PatternModel::{
    Action, BondMarker, MapItem, Network, ObservableKind, PatternSite, RateLaw, Side, Species,
};

pub fn network_to_xml(network: &Network) -> Result<String, InterchangeError> {
    let mut model = XmlElement::new("model").with_attr("id", "network");

    let mut params = XmlElement::new("ListOfParameters");
    for p in &network.parameters {
        params = params.with_child(
            XmlElement::new("Parameter")
                .with_attr("id", &p.name)
                .with_attr("type", "Constant")
                .with_attr("value", &p.expr),
        );
    }
    model = model.with_child(params);

    let mut types = XmlElement::new("ListOfMoleculeTypes");
    for mt in &network.molecule_types {
        let mut comps = XmlElement::new("ListOfComponentTypes");
        for c in &mt.components {
            let mut ct = XmlElement::new("ComponentType").with_attr("id", &c.name);
            if !c.states.is_empty() {
                let mut states = XmlElement::new("ListOfAllowedStates");
                for s in &c.states {
                    states = states.with_child(XmlElement::new("AllowedState").with_attr("id", s));
                }
                ct = ct.with_child(states);
            }
            comps = comps.with_child(ct);
        }
        types = types.with_child(XmlElement::new("MoleculeType").with_attr("id", &mt.name).with_child(comps));
    }
    model = model.with_child(types);

    let mut comps = XmlElement::new("ListOfCompartments");
    for c in &network.compartments {
        let mut el = XmlElement::new("compartment")
            .with_attr("id", &c.name)
            .with_attr("spatialDimensions", &c.dimensions.to_string())
            .with_attr("size", &c.size);
        if let Some(parent) = &c.parent {
            el = el.with_attr("outside", parent);
        }
        comps = comps.with_child(el);
    }
    model = model.with_child(comps);

    let mut species = XmlElement::new("ListOfSpecies");
    for seed in &network.seeds {
        species = species.with_child(
            pattern_element("Species", &seed.id, &seed.species)
                .with_attr("concentration", &seed.amount)
                .with_attr("name", &seed.species.to_string()),
        );
    }
    model = model.with_child(species);

    let mut rules = XmlElement::new("ListOfReactionRules");
    let mut n = 0;
    for (i, rule) in network.rules.iter().enumerate() {
        let name = rule.label(i);
        let rates = rule.rate.expressions();
        n += 1;
        rules = rules.with_child(rule_element(
            &format!("RR{}", n),
            &name,
            &rule.reactants,
            &rule.products,
            rates[0],
            &rule.actions,
            &rule.mapping,
        ));
        if let RateLaw::Reversible { backward, .. } = &rule.rate {
            n += 1;
            let (actions, mapping) = derive_actions(&rule.products, &rule.reactants);
            rules = rules.with_child(rule_element(
                &format!("RR{}", n),
                &format!("_reverse_{}", name),
                &rule.products,
                &rule.reactants,
                backward,
                &actions,
                &mapping,
            ));
        }
    }
    model = model.with_child(rules);

    let mut observables = XmlElement::new("ListOfObservables");
    for (i, o) in network.observables.iter().enumerate() {
        let id = format!("O{}", i + 1);
        let mut patterns = XmlElement::new("ListOfPatterns");
        for (p, pattern) in o.patterns.iter().enumerate() {
            patterns = patterns.with_child(pattern_element("Pattern", &format!("{}_P{}", id, p + 1), pattern));
        }
        let kind = match o.kind {
            ObservableKind::Molecules => "Molecules",
            ObservableKind::Species => "Species",
        };
        observables = observables.with_child(
            XmlElement::new("Observable")
                .with_attr("id", &id)
                .with_attr("name", &o.name)
                .with_attr("type", kind)
                .with_child(patterns),
        );
    }
    model = model.with_child(observables);

    let mut functions = XmlElement::new("ListOfFunctions");
    for f in &network.functions {
        let mut el = XmlElement::new("Function").with_attr("id", &f.name);
        if !f.args.is_empty() {
            let mut args = XmlElement::new("ListOfArguments");
            for a in &f.args {
                args = args.with_child(XmlElement::new("Argument").with_attr("id", a));
            }
            el = el.with_child(args);
        }
        functions = functions.with_child(el.with_child(XmlElement::new("Expression").with_text(&f.expr)));
    }
    model = model.with_child(functions);

    XmlElement::new("sbml")
        .with_attr("xmlns", "http://www.sbml.org/sbml/level3")
        .with_attr("level", "3")
        .with_attr("version", "1")
        .with_child(model)
        .to_document()
}

fn bond_count(marker: &BondMarker) -> &'static str {
    match marker {
        BondMarker::Unbound => "0",
        BondMarker::Label(_) => "1",
        BondMarker::AnyBound => "+",
        BondMarker::Any => "?",
    }
}

fn pattern_element(tag: &str, id: &str, species: &Species) -> XmlElement {
    let mut el = XmlElement::new(tag).with_attr("id", id);
    if let Some(c) = species.compartment() {
        el = el.with_attr("compartment", c);
    }
    let mut molecules = XmlElement::new("ListOfMolecules");
    for (m, mol) in species.molecules().iter().enumerate() {
        let mol_id = format!("{}_M{}", id, m + 1);
        let mut comps = XmlElement::new("ListOfComponents");
        for (c, comp) in mol.components.iter().enumerate() {
            let mut ce = XmlElement::new("Component")
                .with_attr("id", &format!("{}_C{}", mol_id, c + 1))
                .with_attr("name", &comp.name);
            if let Some(state) = &comp.state {
                ce = ce.with_attr("state", state);
            }
            comps = comps.with_child(ce.with_attr("numberOfBonds", bond_count(&comp.bond)));
        }
        let mut me = XmlElement::new("Molecule")
            .with_attr("id", &mol_id)
            .with_attr("name", &mol.type_name);
        if let Some(c) = &mol.compartment {
            me = me.with_attr("compartment", c);
        }
        if !mol.components.is_empty() {
            me = me.with_child(comps);
        }
        molecules = molecules.with_child(me);
    }
    el = el.with_child(molecules);
    let mut bonds = XmlElement::new("ListOfBonds");
    for (k, edge) in species.bonds().enumerate() {
        bonds = bonds.with_child(
            XmlElement::new("Bond")
                .with_attr("id", &format!("{}_B{}", id, k + 1))
                .with_attr("site1", &format!("{}_M{}_C{}", id, edge.a.molecule + 1, edge.a.component + 1))
                .with_attr("site2", &format!("{}_M{}_C{}", id, edge.b.molecule + 1, edge.b.component + 1)),
        );
    }
    if !bonds.children.is_empty() {
        el = el.with_child(bonds);
    }
    el
}

fn site_id(rule_id: &str, site: &PatternSite) -> String {
    let side = match site.side {
        Side::Reactant => "RP",
        Side::Product => "PP",
    };
    let mut id = format!("{}_{}{}_M{}", rule_id, side, site.pattern + 1, site.molecule + 1);
    if let Some(c) = site.component {
        id.push_str(&format!("_C{}", c + 1));
    }
    id
}

fn rule_element(
    id: &str,
    name: &str,
    reactants: &[Species],
    products: &[Species],
    rate: &str,
    actions: &[Action],
    mapping: &[MapItem],
) -> XmlElement {
    let mut rps = XmlElement::new("ListOfReactantPatterns");
    for (p, s) in reactants.iter().enumerate() {
        rps = rps.with_child(pattern_element("ReactantPattern", &format!("{}_RP{}", id, p + 1), s));
    }
    let mut pps = XmlElement::new("ListOfProductPatterns");
    for (p, s) in products.iter().enumerate() {
        pps = pps.with_child(pattern_element("ProductPattern", &format!("{}_PP{}", id, p + 1), s));
    }
    let law = XmlElement::new("RateLaw")
        .with_attr("id", &format!("{}_RateLaw", id))
        .with_attr("type", "Ele")
        .with_child(
            XmlElement::new("ListOfRateConstants")
                .with_child(XmlElement::new("RateConstant").with_attr("value", rate)),
        );
    let mut map = XmlElement::new("Map");
    for item in mapping {
        let mut el = XmlElement::new("MapItem").with_attr("sourceID", &site_id(id, &item.source));
        if let Some(t) = &item.target {
            el = el.with_attr("targetID", &site_id(id, t));
        }
        map = map.with_child(el);
    }
    let mut ops = XmlElement::new("ListOfOperations");
    for action in actions {
        let el = match action {
            Action::AddBond { a, b } | Action::DeleteBond { a, b } => XmlElement::new(action.kind())
                .with_attr("site1", &site_id(id, a))
                .with_attr("site2", &site_id(id, b)),
            Action::StateChange { site, final_state } => XmlElement::new("StateChange")
                .with_attr("site", &site_id(id, site))
                .with_attr("finalState", final_state),
            Action::Create { molecule } => XmlElement::new("Add").with_attr("id", &site_id(id, molecule)),
            Action::Destroy { molecule, whole_species } => {
                if *whole_species {
                    XmlElement::new("Delete")
                        .with_attr("id", &format!("{}_RP{}", id, molecule.pattern + 1))
                        .with_attr("DeleteMolecules", "0")
                } else {
                    XmlElement::new("Delete")
                        .with_attr("id", &site_id(id, molecule))
                        .with_attr("DeleteMolecules", "1")
                }
            }
        };
        ops = ops.with_child(el);
    }
    XmlElement::new("ReactionRule")
        .with_attr("id", id)
        .with_attr("name", name)
        .with_child(rps)
        .with_child(pps)
        .with_child(law)
        .with_child(map)
        .with_child(ops)
}
