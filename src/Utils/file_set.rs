//! Output files written as a unit.
//!
//! Every file is first written to a temporary file in the target directory; only when all
//! of them are on disk are they renamed into place. A failure before that point leaves the
//! directory as it was.
use log::{debug, warn};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Default)]
pub struct FileSet {
    dir: PathBuf,
    files: Vec<(String, String)>,
}

impl FileSet {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            files: Vec::new(),
        }
    }

    pub fn add(&mut self, name: &str, contents: String) {
        self.files.push((name.to_string(), contents));
    }

    pub fn extend(&mut self, files: Vec<(String, String)>) {
        self.files.extend(files);
    }

    pub fn names(&self) -> Vec<&str> {
        self.files.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Writes everything and returns the final paths.
    pub fn commit(self) -> std::io::Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.dir)?;
        let mut staged = Vec::with_capacity(self.files.len());
        for (name, contents) in &self.files {
            let mut tmp = NamedTempFile::new_in(&self.dir)?;
            tmp.write_all(contents.as_bytes())?;
            tmp.flush()?;
            staged.push((tmp, self.dir.join(name)));
        }
        let mut written: Vec<PathBuf> = Vec::with_capacity(staged.len());
        for (tmp, target) in staged {
            if let Err(e) = tmp.persist(&target) {
                for path in &written {
                    if let Err(cleanup) = fs::remove_file(path) {
                        warn!("could not remove {}: {}", path.display(), cleanup);
                    }
                }
                return Err(e.error);
            }
            debug!("wrote {}", target.display());
            written.push(target);
        }
        Ok(written)
    }
}
