use crate::formats::Engine;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub converters: Converters,
    #[serde(default)]
    pub install_roots: InstallRoots,
    #[serde(default)]
    pub thumbnail: Thumbnail,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
    #[serde(default)]
    pub security: Security,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    /// Loads `path` when it exists, otherwise falls back to built-in defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn resources_dir(&self) -> PathBuf {
        PathBuf::from(&self.paths.resources_dir)
    }

    /// Relative converter paths keyed by engine. Engines with an empty entry are left out.
    pub fn converter_table(&self) -> BTreeMap<Engine, PathBuf> {
        [Engine::Alias, Engine::Vred]
            .into_iter()
            .filter_map(|e| {
                let rel = self.converters.get(e).trim();
                (!rel.is_empty()).then(|| (e, PathBuf::from(rel)))
            })
            .collect()
    }

    pub fn install_roots_for(&self, engine: Engine) -> Vec<PathBuf> {
        self.install_roots
            .get(engine)
            .iter()
            .map(PathBuf::from)
            .collect()
    }

    /// Resolves a bundled tool path against `resources_dir`; absolute paths pass through.
    pub fn bundled_tool(&self, relative: &str) -> Option<PathBuf> {
        if relative.trim().is_empty() {
            return None;
        }
        Some(self.resources_dir().join(relative))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            global: Default::default(),
            paths: Default::default(),
            converters: Default::default(),
            install_roots: Default::default(),
            thumbnail: Default::default(),
            limits: Default::default(),
            output: Default::default(),
            logging: Default::default(),
            debug: Default::default(),
            security: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Global {
    pub print_summary: bool,
    pub cleanup_on_success: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            print_summary: true,
            cleanup_on_success: false,
        }
    }
}

/// Converter executables relative to each candidate install root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Converters {
    pub alias: String,
    pub vred: String,
}
impl Converters {
    pub fn get(&self, engine: Engine) -> &str {
        match engine {
            Engine::Alias => &self.alias,
            Engine::Vred => &self.vred,
        }
    }
}
impl Default for Converters {
    fn default() -> Self {
        Self {
            alias: "LMVExtractor/atf_lmv_extractor.exe".into(),
            vred: "LMV/viewing-vpb-lmv.exe".into(),
        }
    }
}

/// Installed application roots per engine, newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallRoots {
    pub alias: Vec<String>,
    pub vred: Vec<String>,
}
impl InstallRoots {
    pub fn get(&self, engine: Engine) -> &[String] {
        match engine {
            Engine::Alias => &self.alias,
            Engine::Vred => &self.vred,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    /// Parent directory for job workspaces. Empty means the system temp dir.
    pub work_dir: String,
    pub workspace_prefix: String,
    pub resources_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            work_dir: "".into(),
            workspace_prefix: "lmv_".into(),
            resources_dir: "resources".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Thumbnail {
    pub renderer: String,
    pub metadata_extractor: String,
    pub size: u32,
    pub depth: u32,
    pub passes: Option<u32>,
    pub metadata_output_name: String,
}
impl Default for Thumbnail {
    fn default() -> Self {
        Self {
            renderer: "SVFThumbnailExtractor/svf_thumb.exe".into(),
            metadata_extractor: "VREDThumbnailExtractor/extractMetaData.exe".into(),
            size: 1280,
            depth: 2,
            passes: Some(4),
            metadata_output_name: "thumbnail.jpg".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// 0 disables the limit.
    pub translate_timeout_seconds: u64,
    pub thumbnail_timeout_seconds: u64,
}

impl Limits {
    pub fn translate_timeout(&self) -> Option<Duration> {
        as_timeout(self.translate_timeout_seconds)
    }

    pub fn thumbnail_timeout(&self) -> Option<Duration> {
        as_timeout(self.thumbnail_timeout_seconds)
    }
}

fn as_timeout(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub write_report_json: bool,
    pub report_filename: String,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            write_report_json: true,
            report_filename: "report.json".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: true,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Debug {
    pub log_tool_output: bool,
    pub dump_effective_config: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            log_tool_output: true,
            dump_effective_config: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Security {
    pub reject_url_inputs: bool,
}
impl Default for Security {
    fn default() -> Self {
        Self {
            reject_url_inputs: true,
        }
    }
}
