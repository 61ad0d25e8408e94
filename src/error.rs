//! Typed errors for each pipeline stage.
//!
//! Every stage owns one enum. The pipeline wraps them in [`Error`] without
//! altering the inner value, so callers can match on the stage that failed.

use crate::formats::{Engine, FileType};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Packaging(#[from] PackagingError),
}

/// Failures while mapping a source file to a converter executable.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("unsupported file type: {}", path.display())]
    UnsupportedFileType { path: PathBuf },

    #[error("no converter registered for {file_type} files (engine {engine})")]
    NoEngineForType { file_type: FileType, engine: Engine },

    #[error("no candidate install locations for engine {engine}")]
    NoCandidates { engine: Engine },

    #[error("converter for engine {engine} not found; tried: {tried:?}")]
    NotFound { engine: Engine, tried: Vec<PathBuf> },
}

/// Failures while running the external converter.
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("converter exited with {}: {output}", code.map_or("signal".to_string(), |c| format!("code {c}")))]
    ConverterFailed { code: Option<i32>, output: String },

    #[error("converter timed out after {timeout:?}: {output}")]
    Timeout { timeout: Duration, output: String },

    #[error("failed to launch converter {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("workspace I/O on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures while producing thumbnail bytes.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("{tool} exited with {}: {output}", code.map_or("signal".to_string(), |c| format!("code {c}")))]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        output: String,
    },

    #[error("{tool} timed out after {timeout:?}")]
    Timeout { tool: String, timeout: Duration },

    #[error("failed to launch {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("expected thumbnail output not found: {}", path.display())]
    MissingOutput { path: PathBuf },

    #[error("thumbnail block in {} has no end marker", path.display())]
    UnterminatedBlock { path: PathBuf },

    #[error("embedded thumbnail is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("no {strategy} tool configured")]
    NoTool { strategy: &'static str },

    #[error("thumbnail I/O on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures while renaming, writing and archiving the translated tree.
#[derive(Debug, Error)]
pub enum PackagingError {
    #[error("no translated output at {}", path.display())]
    MissingOutput { path: PathBuf },

    #[error("svf path requested before translation completed")]
    NotTranslated,

    #[error("no svf file found in {}", dir.display())]
    MissingSvf { dir: PathBuf },

    #[error("invalid canonical name {name:?}: must be a plain file name")]
    InvalidName { name: String },

    #[error("refusing to rename svf: {} already exists", path.display())]
    NameCollision { path: PathBuf },

    #[error("packaging I/O on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("walking {}: {source}", root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("writing archive {}: {source}", path.display())]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

impl ResolutionError {
    /// Short machine-friendly tag, used in summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedFileType { .. } => "unsupported_file_type",
            Self::NoEngineForType { .. } => "no_engine_for_type",
            Self::NoCandidates { .. } => "no_candidates",
            Self::NotFound { .. } => "not_found",
        }
    }
}

impl Error {
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Resolution(_) => "resolve",
            Self::Translation(_) => "translate",
            Self::Extraction(_) => "thumbnail",
            Self::Packaging(_) => "package",
        }
    }
}
