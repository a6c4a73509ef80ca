//! The translation pipeline.
//!
//! `Pipeline::run` walks the stages in order and records where it is; the last state is
//! either `Done` with the written files or `Failed` with the stage that broke.
use crate::Canonical::{CanonicalOracle, LabelMap, label_seeds};
use crate::Driver::expansion::NetworkExpander;
use crate::Driver::{PipelineFailure, Stage, StageError};
use crate::Emitters::{MdlWriter, network_to_bngl};
use crate::Grammar::{SectionTree, parse_model_description, parse_rule_language};
use crate::Interchange::{read_network_parts, split_species};
use crate::PatternModel::Network;
use crate::PatternModel::builder::network_from_sections;
use crate::Utils::FileSet;
use crate::settings::TranslatorConfig;
use log::{error, info};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    Idle,
    Running(Stage),
    Done { files: Vec<PathBuf> },
    Failed { stage: Stage, message: String },
}

fn at<T, E: Into<StageError>>(stage: Stage, result: Result<T, E>) -> Result<T, PipelineFailure> {
    result.map_err(|e| PipelineFailure {
        stage,
        source: e.into(),
    })
}

fn io_at<T>(stage: Stage, context: &str, result: std::io::Result<T>) -> Result<T, PipelineFailure> {
    result.map_err(|e| PipelineFailure {
        stage,
        source: StageError::io(context, e),
    })
}

/// Parses a source by extension: `.bngl` is the rule language, anything else the model
/// description language.
pub fn parse_source(path: &Path, text: &str) -> Result<SectionTree, crate::Grammar::GrammarError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("bngl") => parse_rule_language(text),
        _ => parse_model_description(text),
    }
}

pub struct Pipeline<'a> {
    config: &'a TranslatorConfig,
    state: PipelineState,
    stages_run: Vec<Stage>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a TranslatorConfig) -> Self {
        Self {
            config,
            state: PipelineState::Idle,
            stages_run: Vec::new(),
        }
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// stages entered so far, in order
    pub fn stages_run(&self) -> &[Stage] {
        &self.stages_run
    }

    fn enter(&mut self, stage: Stage) {
        info!("stage {}", stage);
        self.state = PipelineState::Running(stage);
        self.stages_run.push(stage);
    }

    /// Translates `source` into `<out_dir>/<base>.*.mdl`.
    pub fn run<E: NetworkExpander, O: CanonicalOracle>(
        &mut self,
        expander: &E,
        oracle: &mut O,
        source: &Path,
        out_dir: &Path,
        base: &str,
    ) -> Result<Vec<PathBuf>, PipelineFailure> {
        self.stages_run.clear();
        match self.execute(expander, oracle, source, out_dir, base) {
            Ok(files) => {
                info!("wrote {} files to {}", files.len(), out_dir.display());
                self.state = PipelineState::Done {
                    files: files.clone(),
                };
                Ok(files)
            }
            Err(failure) => {
                error!("{}", failure);
                self.state = PipelineState::Failed {
                    stage: failure.stage,
                    message: failure.source.to_string(),
                };
                Err(failure)
            }
        }
    }

    fn execute<E: NetworkExpander, O: CanonicalOracle>(
        &mut self,
        expander: &E,
        oracle: &mut O,
        source: &Path,
        out_dir: &Path,
        base: &str,
    ) -> Result<Vec<PathBuf>, PipelineFailure> {
        self.enter(Stage::ParseSource);
        let text = io_at(
            Stage::ParseSource,
            &format!("cannot read {}", source.display()),
            fs::read_to_string(source),
        )?;
        let tree = at(Stage::ParseSource, parse_source(source, &text))?;
        let source_network: Network = at(Stage::ParseSource, network_from_sections(&tree))?;
        info!(
            "{} molecule types, {} rules, {} seeds",
            source_network.molecule_types.len(),
            source_network.rules.len(),
            source_network.seeds.len()
        );

        // intermediate files go next to the output only when asked for
        let scratch: Option<TempDir>;
        let work_dir: PathBuf = if self.config.keep_intermediate {
            scratch = None;
            io_at(
                Stage::EmitInterchangeInput,
                "cannot create output directory",
                fs::create_dir_all(out_dir),
            )?;
            out_dir.to_path_buf()
        } else {
            let dir = io_at(
                Stage::EmitInterchangeInput,
                "cannot create scratch directory",
                tempfile::tempdir(),
            )?;
            let path = dir.path().to_path_buf();
            scratch = Some(dir);
            path
        };

        self.enter(Stage::EmitInterchangeInput);
        let bngl = at(Stage::EmitInterchangeInput, network_to_bngl(&source_network))?;
        let bngl_path = work_dir.join(format!("{}.bngl", base));
        io_at(
            Stage::EmitInterchangeInput,
            &format!("cannot write {}", bngl_path.display()),
            fs::write(&bngl_path, bngl),
        )?;

        self.enter(Stage::NetworkExpansion);
        let xml_path = at(Stage::NetworkExpansion, expander.expand(&bngl_path, &work_dir))?;

        self.enter(Stage::SplitInterchangeOutput);
        let xml = io_at(
            Stage::SplitInterchangeOutput,
            &format!("cannot read {}", xml_path.display()),
            fs::read_to_string(&xml_path),
        )?;
        let (rest, fragment) = at(Stage::SplitInterchangeOutput, split_species(&xml))?;
        if self.config.keep_intermediate {
            for (suffix, contents) in [("rest", &rest), ("species", &fragment)] {
                let path = work_dir.join(format!("{}.{}.xml", base, suffix));
                io_at(
                    Stage::SplitInterchangeOutput,
                    &format!("cannot write {}", path.display()),
                    fs::write(&path, contents),
                )?;
            }
        }

        self.enter(Stage::CanonicalizeSeeds);
        let labels: LabelMap = at(
            Stage::CanonicalizeSeeds,
            label_seeds(oracle, &rest, &fragment, self.config.verbosity),
        )?;

        self.enter(Stage::BuildPatternModel);
        let model = at(Stage::BuildPatternModel, read_network_parts(&rest, &fragment))?
            .with_extras(source_network.extras.clone());
        at(Stage::BuildPatternModel, model.validate())?;

        self.enter(Stage::EmitFinalFiles);
        let writer = MdlWriter::new(base, &self.config.simulation);
        let parts = at(Stage::EmitFinalFiles, writer.render(&model, &labels))?;
        let mut files = FileSet::new(out_dir);
        files.extend(parts);
        let written = io_at(Stage::EmitFinalFiles, "cannot write output files", files.commit())?;

        drop(scratch);
        Ok(written)
    }
}
