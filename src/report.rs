use crate::{
    formats::{Engine, FileType, ThumbnailStrategy},
    job::{JobState, TranslationJob},
};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub source: PathBuf,
    pub source_sha256: String,
    pub file_type: FileType,
    pub engine: Engine,
    pub state: JobState,
    pub reached: JobState,
    pub converter: Option<PathBuf>,
    pub workspace: PathBuf,
    pub svf: Option<PathBuf>,
    pub archive: Option<PathBuf>,
    pub thumbnail: Option<PathBuf>,
    pub thumbnail_strategy: Option<ThumbnailStrategy>,
    pub thumbnail_bytes: usize,
    pub started: String,
    pub finished: String,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StageError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageError {
    pub stage: String,
    pub message: String,
}

/// Timing and provenance collected around a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RunInfo {
    pub source_sha256: String,
    pub started: String,
    pub finished: String,
    pub duration_ms: u64,
    pub error: Option<StageError>,
}

impl JobReport {
    pub fn from_job(job: &TranslationJob, info: RunInfo) -> Self {
        let package = job.package();
        Self {
            source: job.source_path().to_path_buf(),
            source_sha256: info.source_sha256,
            file_type: job.file_type(),
            engine: job.target_engine(),
            state: job.state(),
            reached: job.reached(),
            converter: job.converter().map(PathBuf::from),
            workspace: job.workspace().root().to_path_buf(),
            svf: package.map(|p| p.svf_path.clone()),
            archive: package.map(|p| p.archive_path.clone()),
            thumbnail: package.and_then(|p| p.thumbnail_path.clone()),
            thumbnail_strategy: job.thumbnail_strategy(),
            thumbnail_bytes: job.thumbnail().map_or(0, <[u8]>::len),
            started: info.started,
            finished: info.finished,
            duration_ms: info.duration_ms,
            error: info.error,
        }
    }
}
