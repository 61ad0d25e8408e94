use crate::{
    config::Config,
    error::{ExtractionError, Result},
    formats::{FileType, ThumbnailStrategy},
    job::TranslationJob,
    packager::{Package, Packager, ThumbnailSource},
    resolver::{ExecutionContext, ResolvedTranslator, TranslatorResolver},
    runner::TranslationRunner,
    thumbnail::{Thumbnail, ThumbnailExtractor, ThumbnailRequest},
};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Caller choices for one job.
#[derive(Debug, Clone, Default)]
pub struct JobOptions {
    /// Renames the svf and names the archive and thumbnail.
    pub canonical_name: Option<String>,
    /// Use this image instead of extracting one.
    pub thumbnail_file: Option<PathBuf>,
}

pub struct Pipeline {
    resolver: TranslatorResolver,
    context: ExecutionContext,
    runner: TranslationRunner,
    thumbnails: ThumbnailExtractor,
    packager: Packager,
    scratch_image_name: String,
}

impl Pipeline {
    pub fn new(
        resolver: TranslatorResolver,
        context: ExecutionContext,
        runner: TranslationRunner,
        thumbnails: ThumbnailExtractor,
        packager: Packager,
    ) -> Self {
        Self {
            resolver,
            context,
            runner,
            thumbnails,
            packager,
            scratch_image_name: "thumbnail.jpg".into(),
        }
    }

    pub fn from_config(cfg: &Config, context: ExecutionContext) -> Self {
        let runner = TranslationRunner::new(cfg.limits.translate_timeout())
            .log_output(cfg.debug.log_tool_output);
        let mut pipeline = Self::new(
            TranslatorResolver::from_config(cfg),
            context,
            runner,
            ThumbnailExtractor::from_config(cfg),
            Packager::new(),
        );
        pipeline.scratch_image_name = cfg.thumbnail.metadata_output_name.clone();
        pipeline
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn resolve(&self, file_type: FileType) -> Result<ResolvedTranslator> {
        Ok(self.resolver.resolve(file_type, &self.context)?)
    }

    /// Runs every stage in order. The first failure marks the job failed and
    /// is returned as-is; the workspace is left in place.
    pub fn run_job(&self, job: &mut TranslationJob, opts: &JobOptions) -> Result<Package> {
        let started = Instant::now();
        let result = self.run_stages(job, opts);
        match &result {
            Ok(pkg) => info!(
                "job done archive={} elapsed_ms={}",
                pkg.archive_path.display(),
                started.elapsed().as_millis()
            ),
            Err(err) => {
                job.fail();
                warn!(
                    "job failed stage={} reached={:?} workspace={}: {err}",
                    err.stage(),
                    job.reached(),
                    job.workspace().root().display()
                );
            }
        }
        result
    }

    fn run_stages(&self, job: &mut TranslationJob, opts: &JobOptions) -> Result<Package> {
        info!(
            "job source={} type={} engine={}",
            job.source_path().display(),
            job.file_type(),
            job.target_engine()
        );

        job.set_canonical_name(opts.canonical_name.clone());
        let resolved = self.resolver.resolve(job.file_type(), &self.context)?;
        job.mark_resolved(resolved.executable.clone());

        let tree = self
            .runner
            .run(job.source_path(), &resolved.executable, job.workspace())?;
        job.mark_translated(tree.clone());

        let (bytes, strategy) = self.thumbnail_stage(job, opts)?;
        debug!(
            "thumbnail bytes={} strategy={:?}",
            bytes.as_ref().map_or(0, Vec::len),
            strategy
        );
        job.mark_thumbnail(bytes, strategy);

        let svf = job.svf_path()?.to_path_buf();
        let thumb = job.thumbnail().map(|b| ThumbnailSource::Bytes(b.to_vec()));
        let package = self.packager.package(
            &tree,
            &svf,
            opts.canonical_name.as_deref(),
            thumb.as_ref(),
        )?;
        job.mark_packaged(package.clone());
        Ok(package)
    }

    fn thumbnail_stage(
        &self,
        job: &mut TranslationJob,
        opts: &JobOptions,
    ) -> Result<(Option<Vec<u8>>, Option<ThumbnailStrategy>)> {
        if let Some(path) = &opts.thumbnail_file {
            let bytes = std::fs::read(path).map_err(|source| ExtractionError::Io {
                path: path.clone(),
                source,
            })?;
            return Ok((Some(bytes), None));
        }

        let wants_svf = job
            .file_type()
            .thumbnail_chain()
            .contains(&ThumbnailStrategy::ExternalImageRenderer);
        let svf = if wants_svf {
            match job.svf_path() {
                Ok(p) => Some(p.to_path_buf()),
                Err(e) => {
                    debug!("no svf for renderer: {e}");
                    None
                }
            }
        } else {
            None
        };

        let scratch = job.workspace().root().join(&self.scratch_image_name);
        let req = ThumbnailRequest {
            file_type: job.file_type(),
            source: job.source_path(),
            svf_path: svf.as_deref(),
            scratch_image: &scratch,
        };
        let found = self.thumbnails.extract(&req)?;
        Ok(match found {
            Some(Thumbnail { bytes, strategy }) => (Some(bytes), Some(strategy)),
            None => (None, None),
        })
    }

    /// Thumbnail for a source file without translating it.
    pub fn thumbnail_only(&self, source: &Path, scratch_image: &Path) -> Result<Option<Thumbnail>> {
        let file_type = FileType::from_path(source)?;
        let req = ThumbnailRequest {
            file_type,
            source,
            svf_path: None,
            scratch_image,
        };
        Ok(self.thumbnails.extract(&req)?)
    }
}
