use super::OracleError;
use super::native_oracle::NativeOracle;
use enum_dispatch::enum_dispatch;
use log::info;

/// Stateful canonicalization backend. Calls are made in the order
/// `init`, then for every candidate `reset`, `init_from_xml`, `query`.
#[enum_dispatch]
pub trait CanonicalOracle {
    /// loads the network definition (interchange document without seed species)
    fn init(&mut self, network_xml: &str, verbosity: u8) -> Result<(), OracleError>;
    /// forgets submitted species, keeps the network
    fn reset(&mut self) -> Result<(), OracleError>;
    /// submits species given as a `ListOfSpecies` document
    fn init_from_xml(&mut self, species_xml: &str) -> Result<(), OracleError>;
    /// ranked canonical labels of the submitted species
    fn query(&mut self, kind: &str) -> Result<Vec<String>, OracleError>;
}

#[derive(Debug, Clone)]
#[enum_dispatch(CanonicalOracle)]
pub enum OracleBackend {
    Native(NativeOracle),
    Scripted(ScriptedOracle),
}

pub fn create_oracle_by_name(name: &str) -> Result<OracleBackend, OracleError> {
    match name {
        "native" | "builtin" => {
            info!("using the native canonicalization oracle");
            Ok(OracleBackend::Native(NativeOracle::new()))
        }
        other => Err(OracleError::Unavailable(format!(
            "no canonicalization backend named '{}'",
            other
        ))),
    }
}

/// In-memory oracle answering every query with a fixed ranked list. It records what it
/// was sent so callers can check the call sequence.
#[derive(Debug, Clone, Default)]
pub struct ScriptedOracle {
    pub ranked: Vec<String>,
    pub fail_init: Option<String>,
    pub network: Option<String>,
    pub submitted: Vec<String>,
    pub resets: usize,
}

impl ScriptedOracle {
    pub fn new(ranked: Vec<&str>) -> Self {
        Self {
            ranked: ranked.into_iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    /// an oracle whose `init` fails, standing in for a missing library
    pub fn unavailable(reason: &str) -> Self {
        Self {
            fail_init: Some(reason.to_string()),
            ..Default::default()
        }
    }
}

impl CanonicalOracle for ScriptedOracle {
    fn init(&mut self, network_xml: &str, _verbosity: u8) -> Result<(), OracleError> {
        if let Some(reason) = &self.fail_init {
            return Err(OracleError::Unavailable(reason.clone()));
        }
        self.network = Some(network_xml.to_string());
        Ok(())
    }

    fn reset(&mut self) -> Result<(), OracleError> {
        self.resets += 1;
        Ok(())
    }

    fn init_from_xml(&mut self, species_xml: &str) -> Result<(), OracleError> {
        if self.network.is_none() {
            return Err(OracleError::Unavailable("species submitted before init".to_string()));
        }
        self.submitted.push(species_xml.to_string());
        Ok(())
    }

    fn query(&mut self, _kind: &str) -> Result<Vec<String>, OracleError> {
        if self.network.is_none() {
            return Err(OracleError::Unavailable("query before init".to_string()));
        }
        Ok(self.ranked.clone())
    }
}
