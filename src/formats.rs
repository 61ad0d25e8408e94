//! Supported source formats and the registry that drives dispatch.
//!
//! Each [`FileType`] maps to exactly one converter [`Engine`] and to an
//! ordered chain of [`ThumbnailStrategy`] values. Adding a format means adding
//! a variant and a registry row; nothing else branches on extensions.

use crate::error::ResolutionError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Line-oriented text container with an optional embedded JPEG block.
    Wire,
    /// Binary project file.
    Vpb,
}

/// Converter family able to translate a given file type.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Alias,
    Vred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThumbnailStrategy {
    EmbeddedTextMarker,
    ExternalImageRenderer,
    ExternalMetadataExtractor,
}

#[derive(Debug)]
pub struct FormatEntry {
    pub file_type: FileType,
    pub extensions: &'static [&'static str],
    pub engine: Engine,
    pub thumbnail_chain: &'static [ThumbnailStrategy],
}

static REGISTRY: LazyLock<HashMap<FileType, FormatEntry>> = LazyLock::new(|| {
    use ThumbnailStrategy::*;
    [
        FormatEntry {
            file_type: FileType::Wire,
            extensions: &["wire"],
            engine: Engine::Alias,
            thumbnail_chain: &[
                EmbeddedTextMarker,
                ExternalImageRenderer,
                ExternalMetadataExtractor,
            ],
        },
        FormatEntry {
            file_type: FileType::Vpb,
            extensions: &["vpb"],
            engine: Engine::Vred,
            thumbnail_chain: &[ExternalMetadataExtractor],
        },
    ]
    .into_iter()
    .map(|e| (e.file_type, e))
    .collect()
});

impl FileType {
    pub const ALL: [FileType; 2] = [FileType::Wire, FileType::Vpb];

    pub fn from_extension(ext: &str) -> Option<FileType> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        REGISTRY
            .values()
            .find(|e| e.extensions.contains(&ext.as_str()))
            .map(|e| e.file_type)
    }

    pub fn from_path(path: &Path) -> Result<FileType, ResolutionError> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(FileType::from_extension)
            .ok_or_else(|| ResolutionError::UnsupportedFileType {
                path: path.to_path_buf(),
            })
    }

    pub fn entry(self) -> &'static FormatEntry {
        // Every variant has a row; the registry is built from the same list.
        &REGISTRY[&self]
    }

    pub fn engine(self) -> Engine {
        self.entry().engine
    }

    pub fn thumbnail_chain(self) -> &'static [ThumbnailStrategy] {
        self.entry().thumbnail_chain
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Wire => "wire",
            FileType::Vpb => "vpb",
        }
    }
}

impl Engine {
    pub fn as_str(self) -> &'static str {
        match self {
            Engine::Alias => "alias",
            Engine::Vred => "vred",
        }
    }
}

impl ThumbnailStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            ThumbnailStrategy::EmbeddedTextMarker => "embedded text marker",
            ThumbnailStrategy::ExternalImageRenderer => "image renderer",
            ThumbnailStrategy::ExternalMetadataExtractor => "metadata extractor",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
