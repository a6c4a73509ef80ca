//! Seed id -> canonical label, produced by driving an oracle one seed at a time.
use super::OracleError;
use super::oracle::CanonicalOracle;
use crate::Interchange::reader::read_species_list;
use crate::Interchange::split::single_species_documents;
use crate::Interchange::xml_tree::parse_xml;
use crate::Interchange::InterchangeError;
use log::{debug, info};
use regex::Regex;
use std::collections::BTreeMap;

/// seed species id -> canonical label
pub type LabelMap = BTreeMap<String, String>;

/// Molecule type names appearing in a label (or pattern text), with multiplicity.
pub fn molecule_names(label: &str) -> Result<BTreeMap<String, usize>, OracleError> {
    let re = Regex::new(r"([A-Za-z_][A-Za-z0-9_]*)\(")
        .map_err(|e| OracleError::Unavailable(e.to_string()))?;
    let mut names = BTreeMap::new();
    for cap in re.captures_iter(label) {
        *names.entry(cap[1].to_string()).or_insert(0) += 1;
    }
    Ok(names)
}

/// Labels every species of `species_fragment`.
///
/// `network_xml` is the interchange document with its species list split out. The oracle
/// is initialised once with it, then reset and fed a one-species document per seed. The
/// oracle's ranked answer is not specific to that seed, so the first label whose
/// molecule-name multiset equals the seed's is kept.
pub fn label_seeds<O: CanonicalOracle>(
    oracle: &mut O,
    network_xml: &str,
    species_fragment: &str,
    verbosity: u8,
) -> Result<LabelMap, OracleError> {
    oracle.init(network_xml, verbosity)?;

    let root = parse_xml(species_fragment)?;
    let list = root
        .find("ListOfSpecies")
        .ok_or_else(|| InterchangeError::malformed("ListOfSpecies"))?;
    let seeds = read_species_list(list)?;

    let mut labels = LabelMap::new();
    for (id, doc) in single_species_documents(species_fragment)? {
        let Some(seed) = seeds.iter().find(|s| s.id == id) else {
            return Err(InterchangeError::malformed(&format!("species {}", id)).into());
        };
        oracle.reset()?;
        oracle.init_from_xml(&doc)?;
        let ranked = oracle.query("complex")?;
        let wanted = seed.species.molecule_counts();
        let mut found = None;
        for label in ranked {
            if molecule_names(&label)? == wanted {
                found = Some(label);
                break;
            }
        }
        let label = found.ok_or_else(|| OracleError::NoMatchingLabel {
            species: format!("{} ({})", id, seed.species),
        })?;
        debug!("seed {} {} labelled {}", id, seed.species, label);
        labels.insert(id, label);
    }
    info!("canonical labels assigned to {} seed species", labels.len());
    Ok(labels)
}
