//! Per-job workspace handling and converter invocation.

use crate::error::TranslationError;
use crate::process::{ProcessError, ToolCommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const MANIFEST_FILE: &str = "index.json";
pub const OUTPUT_DIR: &str = "output";

/// Directory exclusively owned by one job.
///
/// Nothing is removed on drop. Call [`Workspace::release`] to delete it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Creates a fresh, uniquely named directory under `base`.
    pub fn allocate(base: &Path, prefix: &str) -> Result<Self, TranslationError> {
        std::fs::create_dir_all(base).map_err(|source| TranslationError::Io {
            path: base.to_path_buf(),
            source,
        })?;
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(base)
            .map_err(|source| TranslationError::Io {
                path: base.to_path_buf(),
                source,
            })?;
        Ok(Self { root: dir.keep() })
    }

    /// Adopts a caller-chosen directory; it is created on first use.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn release(self) -> std::io::Result<()> {
        if self.root.exists() {
            std::fs::remove_dir_all(&self.root)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TranslationRunner {
    timeout: Option<Duration>,
    log_output: bool,
}

impl TranslationRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            log_output: false,
        }
    }

    pub fn log_output(mut self, enabled: bool) -> Self {
        self.log_output = enabled;
        self
    }

    /// Stages `source` in the workspace and runs the converter on it.
    ///
    /// Returns the workspace root; converters write their tree under
    /// `output/`. On failure the staged files stay on disk.
    pub fn run(
        &self,
        source: &Path,
        executable: &Path,
        workspace: &Workspace,
    ) -> Result<PathBuf, TranslationError> {
        let root = workspace.root();
        std::fs::create_dir_all(root).map_err(|e| io_err(root, e))?;

        let manifest = workspace.manifest_path();
        std::fs::File::create(&manifest).map_err(|e| io_err(&manifest, e))?;

        let file_name = source
            .file_name()
            .ok_or_else(|| io_err(source, std::io::ErrorKind::InvalidInput.into()))?;
        let staged = root.join(file_name);
        debug!("copying {} -> {}", source.display(), staged.display());
        std::fs::copy(source, &staged).map_err(|e| io_err(source, e))?;

        info!("translating {} with {}", staged.display(), executable.display());
        let cmd = ToolCommand::new(executable)
            .arg(&manifest)
            .arg(&staged)
            .timeout(self.timeout);

        let output = match cmd.run() {
            Ok(out) => out,
            Err(ProcessError::Spawn { program, source }) => {
                return Err(TranslationError::Spawn { program, source });
            }
            Err(ProcessError::Timeout {
                timeout, output, ..
            }) => {
                return Err(TranslationError::Timeout {
                    timeout,
                    output: output.combined(),
                });
            }
            Err(ProcessError::Wait { program, source }) => {
                return Err(io_err(&program, source));
            }
        };

        let combined = output.combined();
        if self.log_output && !combined.trim().is_empty() {
            debug!("converter output: {}", combined.trim());
        }

        if !output.success() {
            warn!(
                "converter failed code={:?}; workspace kept at {}",
                output.code(),
                root.display()
            );
            return Err(TranslationError::ConverterFailed {
                code: output.code(),
                output: combined,
            });
        }

        Ok(root.to_path_buf())
    }
}

fn io_err(path: &Path, source: std::io::Error) -> TranslationError {
    TranslationError::Io {
        path: path.to_path_buf(),
        source,
    }
}
