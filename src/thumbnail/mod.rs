//! Thumbnail extraction strategies.
//!
//! The strategy chain comes from the format registry. Only the embedded
//! marker may fall through to the next entry; the first external tool that
//! applies is the last one tried.

pub mod marker;
pub mod metadata;
pub mod render;

use crate::config::Config;
use crate::error::ExtractionError;
use crate::formats::{FileType, ThumbnailStrategy};
use crate::process::ProcessError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub use render::RenderSettings;

#[derive(Debug, Clone, Default)]
pub struct ThumbnailTools {
    pub renderer: Option<PathBuf>,
    pub metadata_extractor: Option<PathBuf>,
}

/// Inputs for one extraction.
#[derive(Debug, Clone, Copy)]
pub struct ThumbnailRequest<'a> {
    pub file_type: FileType,
    pub source: &'a Path,
    /// Located primary asset, when translation produced one.
    pub svf_path: Option<&'a Path>,
    /// Where the metadata extractor writes its JPEG.
    pub scratch_image: &'a Path,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub bytes: Vec<u8>,
    pub strategy: ThumbnailStrategy,
}

#[derive(Debug, Clone, Default)]
pub struct ThumbnailExtractor {
    tools: ThumbnailTools,
    settings: RenderSettings,
    timeout: Option<Duration>,
}

impl ThumbnailExtractor {
    pub fn new(tools: ThumbnailTools, settings: RenderSettings, timeout: Option<Duration>) -> Self {
        Self {
            tools,
            settings,
            timeout,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        let tools = ThumbnailTools {
            renderer: cfg.bundled_tool(&cfg.thumbnail.renderer),
            metadata_extractor: cfg.bundled_tool(&cfg.thumbnail.metadata_extractor),
        };
        let settings = RenderSettings {
            size: cfg.thumbnail.size,
            depth: cfg.thumbnail.depth,
            passes: cfg.thumbnail.passes,
        };
        Self::new(tools, settings, cfg.limits.thumbnail_timeout())
    }

    /// Walks the strategy chain for the file type. `Ok(None)` means no strategy produced data.
    pub fn extract(&self, req: &ThumbnailRequest<'_>) -> Result<Option<Thumbnail>, ExtractionError> {
        for &strategy in req.file_type.thumbnail_chain() {
            debug!("thumbnail strategy {:?} for {}", strategy, req.source.display());
            let bytes = match strategy {
                ThumbnailStrategy::EmbeddedTextMarker => {
                    match marker::read_embedded_thumbnail(req.source)? {
                        Some(bytes) => bytes,
                        None => {
                            info!("no embedded thumbnail in {}", req.source.display());
                            continue;
                        }
                    }
                }
                ThumbnailStrategy::ExternalImageRenderer => {
                    let (Some(svf), Some(renderer)) = (req.svf_path, &self.tools.renderer) else {
                        continue;
                    };
                    render::render_svf_thumbnail(renderer, svf, &self.settings, self.timeout)?
                }
                ThumbnailStrategy::ExternalMetadataExtractor => {
                    let extractor = self.tools.metadata_extractor.as_deref().ok_or(
                        ExtractionError::NoTool {
                            strategy: strategy.as_str(),
                        },
                    )?;
                    metadata::extract_metadata_thumbnail(
                        extractor,
                        req.source,
                        req.scratch_image,
                        self.timeout,
                    )?
                }
            };
            return Ok(Some(Thumbnail { bytes, strategy }));
        }
        Ok(None)
    }
}

pub(crate) fn tool_error(tool: &str, err: ProcessError) -> ExtractionError {
    match err {
        ProcessError::Spawn { program, source } => ExtractionError::Spawn { program, source },
        ProcessError::Timeout { timeout, .. } => ExtractionError::Timeout {
            tool: tool.to_string(),
            timeout,
        },
        ProcessError::Wait { program, source } => ExtractionError::Io {
            path: program,
            source,
        },
    }
}

/// Removes a stale output so that a tool which writes nothing is caught.
pub(crate) fn clear_output(path: &Path) -> Result<(), ExtractionError> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(ExtractionError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
        _ => Ok(()),
    }
}

pub(crate) fn read_output(path: &Path) -> Result<Vec<u8>, ExtractionError> {
    if !path.is_file() {
        return Err(ExtractionError::MissingOutput {
            path: path.to_path_buf(),
        });
    }
    std::fs::read(path).map_err(|source| ExtractionError::Io {
        path: path.to_path_buf(),
        source,
    })
}
