//! Simulation-format emitter: the `<base>.*.mdl` file set.
use super::EmitError;
use crate::Canonical::LabelMap;
use crate::PatternModel::{Network, ObservableKind, ReactionRule, SeedSpecies, Species};
use crate::settings::SimulationSettings;
use log::info;

pub const VOLUME_PROXY: &str = "volume_proxy";
pub const SURFACE_PROXY: &str = "surface_proxy";
pub const PROXY_RATE: &str = "1e-15";
const DEFAULT_SCENE: &str = "Scene";
/// object properties that only describe compartments and are not simulation syntax
const COMPARTMENT_KEYS: &[&str] = &["PARENT", "MEMBRANE", "SIZE", "MEMBRANE_SIZE"];

/// Parts of the file set, in the order they are written.
pub const PARTS: &[&str] = &[
    "main",
    "molecules",
    "reactions",
    "surface_classes",
    "mod_surf_reg",
    "seed",
    "output",
];

#[derive(Debug, Clone)]
pub struct MdlWriter {
    base: String,
    settings: SimulationSettings,
}

impl MdlWriter {
    pub fn new(base: &str, settings: &SimulationSettings) -> Self {
        Self {
            base: base.to_string(),
            settings: settings.clone(),
        }
    }

    /// `<base>.<part>.mdl`
    pub fn file_name(&self, part: &str) -> String {
        format!("{}.{}.mdl", self.base, part)
    }

    /// Renders every file of the set as `(file name, contents)`, in `PARTS` order.
    pub fn render(&self, network: &Network, labels: &LabelMap) -> Result<Vec<(String, String)>, EmitError> {
        let contents = vec![
            self.main(network),
            molecules(),
            reactions(network),
            surface_classes(network),
            surface_regions(network),
            self.seeds(network, labels)?,
            self.output(network),
        ];
        info!("simulation file set {}: {} seeds, {} rules", self.base, network.seeds.len(), network.rules.len());
        Ok(PARTS
            .iter()
            .map(|p| self.file_name(p))
            .zip(contents)
            .collect())
    }

    fn include(&self, part: &str) -> String {
        format!("INCLUDE_FILE = \"{}\"\n", self.file_name(part))
    }

    fn main(&self, network: &Network) -> String {
        let extras = &network.extras;
        let mut out = String::new();
        if extras.statement("ITERATIONS").is_none() {
            out.push_str(&format!("ITERATIONS = {}\n", self.settings.iterations));
        }
        if extras.statement("TIME_STEP").is_none() {
            out.push_str(&format!("TIME_STEP = {}\n", self.settings.time_step));
        }
        for (key, value) in &extras.statements {
            out.push_str(&format!("{} = {}\n", key, value));
        }
        out.push('\n');
        out.push_str(&self.include("molecules"));
        out.push_str(&self.include("reactions"));
        out.push_str(&self.include("surface_classes"));
        out.push('\n');
        for (header, block) in &extras.generic_sections {
            out.push_str(&format!("{}\n{{{}}}\n\n", header, block));
        }
        out.push_str(&self.include("mod_surf_reg"));
        out.push('\n');

        out.push_str(&format!("INSTANTIATE {} OBJECT\n{{\n", scene_name(network)));
        for object in &extras.scene_objects {
            let body: Vec<&str> = object
                .raw_body
                .lines()
                .map(|l| l.trim())
                .filter(|l| !l.is_empty())
                .filter(|l| !COMPARTMENT_KEYS.iter().any(|k| starts_with_key(l, k)))
                .collect();
            out.push_str(&format!("  {} OBJECT {} {{", object.name, object.geometry));
            if body.is_empty() {
                out.push_str("}\n");
            } else {
                out.push('\n');
                for line in body {
                    out.push_str(&format!("    {}\n", line));
                }
                out.push_str("  }\n");
            }
        }
        out.push_str(&format!("  {}", self.include("seed")));
        out.push_str("}\n\n");
        out.push_str(&self.include("output"));
        out
    }

    fn seeds(&self, network: &Network, labels: &LabelMap) -> Result<String, EmitError> {
        let mut out = String::new();
        for seed in &network.seeds {
            let label = labels.get(&seed.id).ok_or_else(|| EmitError::MissingLabel {
                seed: seed.id.clone(),
            })?;
            let release = network.extras.releases.get(&seed.id);
            let site_name = release
                .map(|r| r.site_name.clone())
                .unwrap_or_else(|| format!("{}_release", seed.id));
            let shape = match release.and_then(|r| r.shape.clone()) {
                Some(shape) => shape,
                None => self.release_shape(network, seed),
            };
            let molecule = if network.is_surface_species(&seed.species) {
                format!("{}'", SURFACE_PROXY)
            } else {
                VOLUME_PROXY.to_string()
            };
            let quantity = release
                .map(|r| r.quantity_key.as_str())
                .filter(|k| !k.is_empty())
                .unwrap_or("NUMBER_TO_RELEASE");
            let probability = release
                .and_then(|r| r.probability.as_deref())
                .unwrap_or("1");
            out.push_str(&format!("{} RELEASE_SITE\n{{\n", site_name));
            out.push_str(&format!("  SHAPE = {}\n", shape));
            out.push_str(&format!("  MOLECULE = {}\n", molecule));
            out.push_str(&format!("  {} = {}\n", quantity, seed.amount));
            out.push_str(&format!("  RELEASE_PROBABILITY = {}\n", probability));
            out.push_str(&format!("  GRAPH_PATTERN = \"{}\"\n", label));
            out.push_str("}\n");
        }
        Ok(out)
    }

    /// Region of the seed's compartment: a volume minus the volumes nested directly in it,
    /// a surface as the region of the object it wraps.
    fn release_shape(&self, network: &Network, seed: &SeedSpecies) -> String {
        let scene = scene_name(network);
        let compartment = seed
            .species
            .compartment()
            .or_else(|| seed.species.molecules().iter().find_map(|m| m.compartment.as_deref()))
            .and_then(|c| network.compartment(c));
        let Some(compartment) = compartment else {
            return format!("{}.{}[ALL]", scene, self.settings.default_release_object);
        };
        if compartment.dimensions == 2 {
            let object = network
                .compartments
                .iter()
                .find(|c| c.dimensions == 3 && c.parent.as_deref() == Some(compartment.name.as_str()))
                .map(|c| c.name.as_str())
                .unwrap_or(compartment.name.as_str());
            return format!("{}.{}[ALL]", scene, object);
        }
        let mut shape = format!("{}.{}[ALL]", scene, compartment.name);
        for inner in nested_volumes(network, &compartment.name) {
            shape.push_str(&format!(" - {}.{}[ALL]", scene, inner));
        }
        shape
    }

    fn output(&self, network: &Network) -> String {
        let step = network
            .extras
            .output_step
            .as_deref()
            .unwrap_or(&self.settings.output_step);
        let mut out = format!("REACTION_DATA_OUTPUT\n{{\n  STEP = {}\n", step);
        for o in &network.observables {
            let counter = match o.kind {
                ObservableKind::Molecules => "COUNT",
                ObservableKind::Species => "COUNT_SPECIES",
            };
            let path = network
                .extras
                .observable_paths
                .get(&o.name)
                .cloned()
                .unwrap_or_else(|| format!("./react_data/{}.dat", o.name));
            let counts: Vec<String> = o
                .patterns
                .iter()
                .map(|p| format!("{}[{}, WORLD]", counter, oriented(network, p, false)))
                .collect();
            out.push_str(&format!("  {{{}}} => \"{}\"\n", counts.join(" + "), path));
        }
        out.push_str("}\n");
        out
    }
}

fn scene_name(network: &Network) -> &str {
    network.extras.scene_name.as_deref().unwrap_or(DEFAULT_SCENE)
}

fn starts_with_key(line: &str, key: &str) -> bool {
    line.strip_prefix(key)
        .is_some_and(|rest| rest.trim_start().starts_with('='))
}

/// volumes whose parent is `volume`, directly or through their membrane
fn nested_volumes<'a>(network: &'a Network, volume: &str) -> Vec<&'a str> {
    network
        .compartments
        .iter()
        .filter(|c| c.dimensions == 3)
        .filter(|c| match c.parent.as_deref().and_then(|p| network.compartment(p)) {
            Some(p) if p.name == volume => true,
            Some(p) if p.dimensions == 2 => p.parent.as_deref() == Some(volume),
            _ => false,
        })
        .map(|c| c.name.as_str())
        .collect()
}

/// One proxy pair serves every seed: each release site tells its species apart by its
/// `GRAPH_PATTERN` label, so per-seed proxies would only repeat the same two names.
fn molecules() -> String {
    let mut out = String::from("DEFINE_MOLECULES\n{\n");
    out.push_str(&format!("  {}\n  {{\n    DIFFUSION_CONSTANT_3D = 0\n    EXTERN\n  }}\n", VOLUME_PROXY));
    out.push_str(&format!("  {}\n  {{\n    DIFFUSION_CONSTANT_2D = 0\n    EXTERN\n  }}\n", SURFACE_PROXY));
    out.push_str("}\n");
    out
}

/// pattern text, with the orientation mark when `force` is set or the species sits on a surface
fn oriented(network: &Network, species: &Species, force: bool) -> String {
    if species.is_empty() {
        return "NULL".to_string();
    }
    if force || network.is_surface_species(species) {
        format!("{}'", species)
    } else {
        species.to_string()
    }
}

fn reaction_line(network: &Network, index: usize, rule: &ReactionRule) -> String {
    let surface = rule
        .reactants
        .iter()
        .chain(rule.products.iter())
        .any(|s| network.is_surface_species(s));
    let side = |patterns: &[Species]| {
        if patterns.is_empty() {
            return "NULL".to_string();
        }
        patterns
            .iter()
            .map(|s| oriented(network, s, surface))
            .collect::<Vec<_>>()
            .join(" + ")
    };
    let arrow = if rule.rate.is_reversible() { "<->" } else { "->" };
    format!(
        "  {} {} {} [{}] : {}\n",
        side(&rule.reactants),
        arrow,
        side(&rule.products),
        rule.rate.expressions().join(", "),
        rule.label(index)
    )
}

fn reactions(network: &Network) -> String {
    let mut out = String::from("DEFINE_REACTIONS\n{\n");
    out.push_str(&format!("  {v} -> {v} [{r}]\n", v = VOLUME_PROXY, r = PROXY_RATE));
    out.push_str(&format!("  {s}' -> {s}' [{r}]\n", s = SURFACE_PROXY, r = PROXY_RATE));
    out.push_str(&format!(
        "  {v}' + {s}' -> {s}' [{r}]\n",
        v = VOLUME_PROXY,
        s = SURFACE_PROXY,
        r = PROXY_RATE
    ));
    for (i, rule) in network.rules.iter().enumerate() {
        out.push_str(&reaction_line(network, i, rule));
    }
    out.push_str("}\n");
    out
}

fn surface_classes(network: &Network) -> String {
    match &network.extras.surface_classes {
        Some(raw) => format!("DEFINE_SURFACE_CLASSES\n{{\n  {}\n}}\n", raw),
        None => String::new(),
    }
}

fn surface_regions(network: &Network) -> String {
    match &network.extras.surface_regions {
        Some(raw) => format!("MODIFY_SURFACE_REGIONS\n{{\n  {}\n}}\n", raw),
        None => String::new(),
    }
}
