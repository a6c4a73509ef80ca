//! External network expansion.
//!
//! The expansion tool is called as `<tool> [args] -xml -check <file.bngl> --outdir <dir>`
//! and must leave `<dir>/<file>.xml` behind. A nonzero exit status is a hard failure; its
//! stderr is kept for the error message.
use crate::settings::TranslatorConfig;
use log::{debug, info, warn};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum ExpansionError {
    #[error("{tool} exited with status {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },
    #[error("{tool} did not finish within {secs} s and was stopped")]
    TimedOut { tool: String, secs: u64 },
    #[error("cannot run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("expansion produced no interchange document at {}", .0.display())]
    MissingOutput(PathBuf),
}

/// Turns a rule-language file into an interchange document.
pub trait NetworkExpander {
    /// returns the path of the interchange document written into `out_dir`
    fn expand(&self, bngl: &Path, out_dir: &Path) -> Result<PathBuf, ExpansionError>;
}

/// Subprocess adapter for the rule-expansion tool.
#[derive(Debug, Clone)]
pub struct BngExpander {
    pub tool: String,
    pub args: Vec<String>,
    pub timeout: Option<Duration>,
}

impl BngExpander {
    pub fn new(tool: &str) -> Self {
        Self {
            tool: tool.to_string(),
            args: Vec::new(),
            timeout: None,
        }
    }

    pub fn from_config(config: &TranslatorConfig) -> Self {
        Self {
            tool: config.expansion_tool.clone(),
            args: config.expansion_args.clone(),
            timeout: config.expansion_timeout_secs.map(Duration::from_secs),
        }
    }

    fn spawn_error(&self, source: std::io::Error) -> ExpansionError {
        ExpansionError::Spawn {
            tool: self.tool.clone(),
            source,
        }
    }

    fn wait(&self, child: &mut std::process::Child) -> Result<ExitStatus, ExpansionError> {
        let Some(limit) = self.timeout else {
            return child.wait().map_err(|e| self.spawn_error(e));
        };
        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait().map_err(|e| self.spawn_error(e))? {
                return Ok(status);
            }
            if start.elapsed() >= limit {
                warn!("{} exceeded {:?}, stopping it", self.tool, limit);
                if let Err(e) = child.kill() {
                    warn!("could not stop {}: {}", self.tool, e);
                }
                // reap the child
                let _ = child.wait();
                return Err(ExpansionError::TimedOut {
                    tool: self.tool.clone(),
                    secs: limit.as_secs(),
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl NetworkExpander for BngExpander {
    fn expand(&self, bngl: &Path, out_dir: &Path) -> Result<PathBuf, ExpansionError> {
        let mut stderr_log = tempfile::tempfile().map_err(|e| self.spawn_error(e))?;
        let stderr_handle = stderr_log.try_clone().map_err(|e| self.spawn_error(e))?;
        info!("running {} on {}", self.tool, bngl.display());
        let mut child = Command::new(&self.tool)
            .args(&self.args)
            .arg("-xml")
            .arg("-check")
            .arg(bngl)
            .arg("--outdir")
            .arg(out_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr_handle))
            .spawn()
            .map_err(|e| self.spawn_error(e))?;
        let status = self.wait(&mut child)?;

        if !status.success() {
            let mut stderr = String::new();
            if stderr_log.seek(SeekFrom::Start(0)).is_ok() {
                let _ = stderr_log.read_to_string(&mut stderr);
            }
            return Err(ExpansionError::ToolFailed {
                tool: self.tool.clone(),
                status: status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string()),
                stderr: stderr.trim().to_string(),
            });
        }

        let stem = bngl
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let xml = out_dir.join(format!("{}.xml", stem));
        if !xml.exists() {
            return Err(ExpansionError::MissingOutput(xml));
        }
        debug!("interchange document at {}", xml.display());
        Ok(xml)
    }
}
