//! Rule-language emitter.
use super::EmitError;
use crate::PatternModel::{Network, ObservableKind, ReactionRule, Species};

fn side(patterns: &[Species]) -> String {
    if patterns.is_empty() {
        return "0".to_string();
    }
    patterns
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(" + ")
}

fn rule_line(rule: &ReactionRule) -> String {
    let arrow = if rule.rate.is_reversible() { "<->" } else { "->" };
    let equation = format!(
        "{} {} {} {}",
        side(&rule.reactants),
        arrow,
        side(&rule.products),
        rule.rate.expressions().join(", ")
    );
    match &rule.name {
        Some(name) => format!("{}: {}", name, equation),
        None => equation,
    }
}

/// `begin <name>`, indented lines, `end <name>`
fn section(out: &mut String, name: &str, lines: Vec<String>) {
    out.push_str(&format!("begin {}\n", name));
    for line in lines {
        out.push_str("  ");
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str(&format!("end {}\n", name));
}

/// Writes every section, parents before children for compartments, parameters in
/// dependency order when the model carries that metadata.
pub fn network_to_bngl(network: &Network) -> Result<String, EmitError> {
    let mut out = String::from("# rule-language model written by kirulenet\n");

    let parameters = network
        .parameters_in_dependency_order()
        .into_iter()
        .map(|p| format!("{} {}", p.name, p.expr))
        .collect();
    section(&mut out, "parameters", parameters);

    let types = network.molecule_types.iter().map(|m| m.to_string()).collect();
    section(&mut out, "molecule types", types);

    let mut compartments = Vec::new();
    for c in network.compartments_parent_first()? {
        // size must stay one word, a trailing identifier would read as the parent
        let size: String = c.size.split_whitespace().collect();
        compartments.push(match &c.parent {
            Some(parent) => format!("{} {} {} {}", c.name, c.dimensions, size, parent),
            None => format!("{} {} {}", c.name, c.dimensions, size),
        });
    }
    section(&mut out, "compartments", compartments);

    let seeds = network
        .seeds
        .iter()
        .map(|s| format!("{} {}", s.species, s.amount))
        .collect();
    section(&mut out, "seed species", seeds);

    let observables = network
        .observables
        .iter()
        .map(|o| {
            let kind = match o.kind {
                ObservableKind::Molecules => "Molecules",
                ObservableKind::Species => "Species",
            };
            let patterns: Vec<String> = o.patterns.iter().map(|p| p.to_string()).collect();
            format!("{} {} {}", kind, o.name, patterns.join(", "))
        })
        .collect();
    section(&mut out, "observables", observables);

    let functions = network
        .functions
        .iter()
        .map(|f| format!("{}({}) = {}", f.name, f.args.join(", "), f.expr))
        .collect();
    section(&mut out, "functions", functions);

    let rules = network.rules.iter().map(rule_line).collect();
    section(&mut out, "reaction rules", rules);
    Ok(out)
}
