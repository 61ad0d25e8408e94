use crate::error::{PackagingError, ResolutionError};
use crate::formats::{Engine, FileType, ThumbnailStrategy};
use crate::packager::{self, Package};
use crate::runner::Workspace;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Init,
    Resolved,
    Translated,
    ThumbnailExtracted,
    Packaged,
    Failed,
}

/// One source file moving through the pipeline.
#[derive(Debug)]
pub struct TranslationJob {
    source_path: PathBuf,
    file_type: FileType,
    workspace: Workspace,
    state: JobState,
    reached: JobState,
    converter: Option<PathBuf>,
    output_tree: Option<PathBuf>,
    svf_path: Option<PathBuf>,
    canonical_name: Option<String>,
    thumbnail: Option<Vec<u8>>,
    thumbnail_strategy: Option<ThumbnailStrategy>,
    package: Option<Package>,
}

impl TranslationJob {
    pub fn new(source: impl Into<PathBuf>, workspace: Workspace) -> Result<Self, ResolutionError> {
        let source_path = source.into();
        let file_type = FileType::from_path(&source_path)?;
        Ok(Self {
            source_path,
            file_type,
            workspace,
            state: JobState::Init,
            reached: JobState::Init,
            converter: None,
            output_tree: None,
            svf_path: None,
            canonical_name: None,
            thumbnail: None,
            thumbnail_strategy: None,
            package: None,
        })
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    pub fn target_engine(&self) -> Engine {
        self.file_type.engine()
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Last non-failed state the job got to.
    pub fn reached(&self) -> JobState {
        self.reached
    }

    pub fn converter(&self) -> Option<&Path> {
        self.converter.as_deref()
    }

    pub fn output_tree(&self) -> Option<&Path> {
        self.output_tree.as_deref()
    }

    pub fn thumbnail(&self) -> Option<&[u8]> {
        self.thumbnail.as_deref()
    }

    /// Strategy that produced the thumbnail; `None` when supplied by the caller or absent.
    pub fn thumbnail_strategy(&self) -> Option<ThumbnailStrategy> {
        self.thumbnail_strategy
    }

    pub fn package(&self) -> Option<&Package> {
        self.package.as_ref()
    }

    pub fn archive_path(&self) -> Option<&Path> {
        self.package.as_ref().map(|p| p.archive_path.as_path())
    }

    pub fn is_complete(&self) -> bool {
        self.archive_path().is_some()
    }

    /// Stem of the source file; converters name their svf after it.
    pub fn default_stem(&self) -> String {
        self.source_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Located primary asset. Fails before translation; cached once found.
    pub fn svf_path(&mut self) -> Result<&Path, PackagingError> {
        if self.svf_path.is_none() {
            let tree = self
                .output_tree
                .as_deref()
                .ok_or(PackagingError::NotTranslated)?;
            let located = packager::locate_svf(
                tree,
                &self.default_stem(),
                self.canonical_name.as_deref(),
            )?;
            self.svf_path = Some(located);
        }
        self.svf_path.as_deref().ok_or(PackagingError::NotTranslated)
    }

    /// Name the svf will be renamed to; kept out of the svf lookup.
    pub fn set_canonical_name(&mut self, name: Option<String>) {
        self.canonical_name = name;
    }

    pub fn canonical_name(&self) -> Option<&str> {
        self.canonical_name.as_deref()
    }

    pub(crate) fn mark_resolved(&mut self, converter: PathBuf) {
        self.converter = Some(converter);
        self.advance(JobState::Resolved);
    }

    pub(crate) fn mark_translated(&mut self, output_tree: PathBuf) {
        self.output_tree = Some(output_tree);
        self.advance(JobState::Translated);
    }

    pub(crate) fn mark_thumbnail(
        &mut self,
        bytes: Option<Vec<u8>>,
        strategy: Option<ThumbnailStrategy>,
    ) {
        self.thumbnail = bytes;
        self.thumbnail_strategy = strategy;
        self.advance(JobState::ThumbnailExtracted);
    }

    pub(crate) fn mark_packaged(&mut self, package: Package) {
        self.svf_path = Some(package.svf_path.clone());
        self.package = Some(package);
        self.advance(JobState::Packaged);
    }

    pub(crate) fn fail(&mut self) {
        self.state = JobState::Failed;
    }

    fn advance(&mut self, next: JobState) {
        self.state = next;
        self.reached = next;
    }
}
