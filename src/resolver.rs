//! Maps a file type and execution context to a converter executable.

use crate::config::Config;
use crate::error::ResolutionError;
use crate::formats::{Engine, FileType};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// The application a job is launched from, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEngine {
    pub engine: Engine,
    pub bin_dir: PathBuf,
}

/// Everything the resolver knows about installed tools. Passed explicitly.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    pub host: Option<HostEngine>,
    /// Installed roots per engine, newest first.
    pub install_roots: BTreeMap<Engine, Vec<PathBuf>>,
    /// Bundled tools; always the last candidate when set.
    pub resources_dir: Option<PathBuf>,
}

impl ExecutionContext {
    pub fn from_config(cfg: &Config, host: Option<HostEngine>) -> Self {
        let install_roots = [Engine::Alias, Engine::Vred]
            .into_iter()
            .map(|e| (e, cfg.install_roots_for(e)))
            .collect();
        Self {
            host,
            install_roots,
            resources_dir: Some(cfg.resources_dir()),
        }
    }

    /// Ordered candidate roots for `engine`, duplicates removed (first wins).
    pub fn candidates_for(&self, engine: Engine) -> Vec<PathBuf> {
        let host = self
            .host
            .iter()
            .filter(|h| h.engine == engine)
            .map(|h| h.bin_dir.clone());
        let installed = self
            .install_roots
            .get(&engine)
            .into_iter()
            .flatten()
            .cloned();
        let bundled = self.resources_dir.iter().cloned();

        let mut seen = HashSet::new();
        host.chain(installed)
            .chain(bundled)
            .filter(|p| seen.insert(p.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTranslator {
    pub file_type: FileType,
    pub engine: Engine,
    pub executable: PathBuf,
}

#[derive(Debug, Clone)]
pub struct TranslatorResolver {
    converters: BTreeMap<Engine, PathBuf>,
}

impl TranslatorResolver {
    pub fn new(converters: BTreeMap<Engine, PathBuf>) -> Self {
        Self { converters }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.converter_table())
    }

    pub fn resolve(
        &self,
        file_type: FileType,
        ctx: &ExecutionContext,
    ) -> Result<ResolvedTranslator, ResolutionError> {
        let engine = file_type.engine();
        let relative = self
            .converters
            .get(&engine)
            .ok_or(ResolutionError::NoEngineForType { file_type, engine })?;
        let candidates = ctx.candidates_for(engine);
        let executable = first_existing(engine, relative, &candidates)?;
        debug!("resolved {file_type} converter: {}", executable.display());
        Ok(ResolvedTranslator {
            file_type,
            engine,
            executable,
        })
    }
}

/// Returns the first `root/relative` that is an existing file.
pub fn first_existing(
    engine: Engine,
    relative: &Path,
    candidates: &[PathBuf],
) -> Result<PathBuf, ResolutionError> {
    if candidates.is_empty() {
        return Err(ResolutionError::NoCandidates { engine });
    }

    let mut tried = Vec::with_capacity(candidates.len());
    for root in candidates {
        let path = root.join(relative);
        if path.is_file() {
            return Ok(path);
        }
        debug!("no {engine} converter at {}", path.display());
        tried.push(path);
    }

    Err(ResolutionError::NotFound { engine, tried })
}
