use crate::{
    config::Config,
    formats::{Engine, FileType},
    job::TranslationJob,
    pipeline::{JobOptions, Pipeline},
    report::{JobReport, RunInfo, StageError},
    resolver::{ExecutionContext, HostEngine},
    runner::Workspace,
    util::{ensure_dir, hash_file, looks_like_url, now_rfc3339},
};
use anyhow::{Context, Result, anyhow};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "lmv-translate")]
#[command(about = "Translate design files to LMV packages with external converters")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./lmv-translate.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Application the job runs inside; its bin dir is tried first for that engine.
    #[arg(long, global = true, requires = "host_bin_dir")]
    pub host_engine: Option<Engine>,

    #[arg(long, global = true)]
    pub host_bin_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report which converter each file type resolves to.
    Doctor {},
    Resolve {
        #[arg(long)]
        input: PathBuf,
    },
    /// Extract a thumbnail from a source file without translating it.
    Thumbnail {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    Translate(TranslateArgs),
}

#[derive(ClapArgs, Debug)]
pub struct TranslateArgs {
    #[arg(long)]
    pub input: PathBuf,

    /// Canonical name for the svf, thumbnail and archive.
    #[arg(long)]
    pub name: Option<String>,

    /// Use this directory instead of allocating a fresh workspace.
    #[arg(long)]
    pub workspace: Option<PathBuf>,

    /// Thumbnail image to package instead of extracting one.
    #[arg(long)]
    pub thumbnail: Option<PathBuf>,

    /// Copy the archive (and thumbnail) here when done.
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Delete the workspace after a successful run.
    #[arg(long, requires = "out_dir")]
    pub cleanup: bool,
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg_path = resolve_config_path(args.config.as_deref());
    let cfg = Config::load_or_default(&cfg_path)?;

    match &args.cmd {
        Command::Doctor {} => {
            let _guard = init_logging(&args, &cfg, None)?;
            doctor(&args, &cfg)
        }
        Command::Resolve { input } => {
            let _guard = init_logging(&args, &cfg, None)?;
            resolve(&args, &cfg, input)
        }
        Command::Thumbnail { input, out } => {
            let _guard = init_logging(&args, &cfg, None)?;
            thumbnail(&args, &cfg, input, out)
        }
        Command::Translate(t) => translate(&args, &cfg, t),
    }
}

fn resolve_config_path(user: Option<&Path>) -> PathBuf {
    if let Some(p) = user {
        return p.to_path_buf();
    }
    let default = PathBuf::from("lmv-translate.toml");
    if default.exists() {
        default
    } else {
        PathBuf::from("lmv-translate.example.toml")
    }
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn execution_context(args: &Args, cfg: &Config) -> ExecutionContext {
    let host = match (args.host_engine, &args.host_bin_dir) {
        (Some(engine), Some(dir)) => Some(HostEngine {
            engine,
            bin_dir: dir.clone(),
        }),
        _ => None,
    };
    ExecutionContext::from_config(cfg, host)
}

fn doctor(args: &Args, cfg: &Config) -> Result<()> {
    let pipeline = Pipeline::from_config(cfg, execution_context(args, cfg));
    let mut rows = Vec::new();
    for file_type in FileType::ALL {
        let engine = file_type.engine();
        let candidates = pipeline.context().candidates_for(engine);
        let row = match pipeline.resolve(file_type) {
            Ok(r) => serde_json::json!({
                "file_type": file_type,
                "engine": engine,
                "ok": true,
                "executable": r.executable,
                "candidates": candidates,
            }),
            Err(crate::Error::Resolution(e)) => serde_json::json!({
                "file_type": file_type,
                "engine": engine,
                "ok": false,
                "error": e.kind(),
                "message": e.to_string(),
                "candidates": candidates,
            }),
            Err(e) => return Err(e.into()),
        };
        rows.push(row);
    }

    let tool = |rel: &str| {
        cfg.bundled_tool(rel)
            .map(|p| serde_json::json!({ "path": p, "exists": p.is_file() }))
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "converters": rows,
            "thumbnail_renderer": tool(&cfg.thumbnail.renderer),
            "metadata_extractor": tool(&cfg.thumbnail.metadata_extractor),
        }))?
    );
    Ok(())
}

fn resolve(args: &Args, cfg: &Config, input: &Path) -> Result<()> {
    let file_type = FileType::from_path(input)?;
    let pipeline = Pipeline::from_config(cfg, execution_context(args, cfg));
    let resolved = pipeline.resolve(file_type)?;
    println!("{}", serde_json::to_string_pretty(&resolved)?);
    Ok(())
}

fn thumbnail(args: &Args, cfg: &Config, input: &Path, out: &Path) -> Result<()> {
    validate_input(cfg, input)?;
    let pipeline = Pipeline::from_config(cfg, execution_context(args, cfg));

    // The extractor writes into a temp dir removed on drop.
    let scratch = tempfile::Builder::new()
        .prefix("lmv_thumb")
        .tempdir()
        .with_context(|| "creating scratch thumbnail dir")?;
    let scratch_image = scratch.path().join(&cfg.thumbnail.metadata_output_name);

    let thumb = pipeline
        .thumbnail_only(input, &scratch_image)?
        .ok_or_else(|| anyhow!("no thumbnail available for {}", input.display()))?;

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    std::fs::write(out, &thumb.bytes).with_context(|| format!("writing {}", out.display()))?;
    info!(
        "thumbnail {} bytes via {:?} -> {}",
        thumb.bytes.len(),
        thumb.strategy,
        out.display()
    );
    Ok(())
}

fn translate(args: &Args, cfg: &Config, t: &TranslateArgs) -> Result<()> {
    validate_input(cfg, &t.input)?;

    let workspace = match &t.workspace {
        Some(dir) => Workspace::at(dir),
        None => Workspace::allocate(&work_base(cfg), &cfg.paths.workspace_prefix)?,
    };
    ensure_dir(workspace.root())?;

    let log_path = resolve_log_path(cfg, Some(workspace.root()));
    let _guard = init_logging(args, cfg, log_path.as_deref())?;

    info!("workspace={}", workspace.root().display());

    if cfg.debug.dump_effective_config {
        let raw = toml::to_string(cfg).with_context(|| "serializing effective config")?;
        let path = workspace.root().join("effective-config.toml");
        std::fs::write(&path, raw).with_context(|| format!("writing {}", path.display()))?;
    }

    let source_sha256 = hash_file(&t.input)
        .with_context(|| format!("hashing input: {}", t.input.display()))?;
    let pipeline = Pipeline::from_config(cfg, execution_context(args, cfg));
    let mut job = TranslationJob::new(&t.input, workspace)?;
    let opts = JobOptions {
        canonical_name: t.name.clone(),
        thumbnail_file: t.thumbnail.clone(),
    };

    let started = now_rfc3339();
    let clock = Instant::now();
    let result = pipeline.run_job(&mut job, &opts);

    let info = RunInfo {
        source_sha256,
        started,
        finished: now_rfc3339(),
        duration_ms: clock.elapsed().as_millis() as u64,
        error: result.as_ref().err().map(|e| StageError {
            stage: e.stage().to_string(),
            message: e.to_string(),
        }),
    };
    let report = JobReport::from_job(&job, info);

    if cfg.output.write_report_json {
        let path = job.workspace().root().join(&cfg.output.report_filename);
        std::fs::write(&path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("writing report: {}", path.display()))?;
    }

    let package = result.with_context(|| {
        format!(
            "translation failed; workspace kept at {}",
            job.workspace().root().display()
        )
    })?;

    let mut archive = package.archive_path.clone();
    let mut thumbnail = package.thumbnail_path.clone();
    if let Some(out_dir) = &t.out_dir {
        ensure_dir(out_dir)?;
        archive = copy_into(&package.archive_path, out_dir)?;
        thumbnail = package
            .thumbnail_path
            .as_deref()
            .map(|p| copy_into(p, out_dir))
            .transpose()?;
    }

    let cleaned = t.out_dir.is_some() && (t.cleanup || cfg.global.cleanup_on_success);
    if cleaned {
        let root = job.workspace().root().to_path_buf();
        job.workspace()
            .clone()
            .release()
            .with_context(|| format!("removing workspace {}", root.display()))?;
        info!("removed workspace {}", root.display());
    } else if t.cleanup || cfg.global.cleanup_on_success {
        warn!("cleanup skipped: no --out-dir, the archive lives in the workspace");
    }

    if cfg.global.print_summary {
        let workspace = (!cleaned).then(|| job.workspace().root().to_path_buf());
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "status": "ok",
                "archive": archive,
                "thumbnail": thumbnail,
                "workspace": workspace,
                "report": report,
            }))?
        );
    }

    Ok(())
}

fn copy_into(src: &Path, dir: &Path) -> Result<PathBuf> {
    let name = src
        .file_name()
        .ok_or_else(|| anyhow!("no file name: {}", src.display()))?;
    let dest = dir.join(name);
    std::fs::copy(src, &dest)
        .with_context(|| format!("copying {} -> {}", src.display(), dest.display()))?;
    Ok(dest)
}

fn work_base(cfg: &Config) -> PathBuf {
    if cfg.paths.work_dir.is_empty() {
        std::env::temp_dir()
    } else {
        PathBuf::from(&cfg.paths.work_dir)
    }
}

fn validate_input(cfg: &Config, input: &Path) -> Result<()> {
    let input_str = input.display().to_string();

    if cfg.security.reject_url_inputs && looks_like_url(&input_str) {
        return Err(anyhow!("URL inputs are disabled: {input_str}"));
    }

    if !input.is_file() {
        return Err(anyhow!("input does not exist: {}", input.display()));
    }

    FileType::from_path(input)?;
    Ok(())
}

fn resolve_log_path(cfg: &Config, workspace: Option<&Path>) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }

    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }

    workspace.map(|ws| ws.join("logs").join("lmv-translate.log"))
}
