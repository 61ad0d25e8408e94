use super::{clear_output, read_output, tool_error};
use crate::error::ExtractionError;
use crate::process::ToolCommand;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSettings {
    pub size: u32,
    pub depth: u32,
    pub passes: Option<u32>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            size: 1280,
            depth: 2,
            passes: Some(4),
        }
    }
}

impl RenderSettings {
    /// File the renderer writes for the first view.
    pub fn output_file_name(&self) -> String {
        format!("01_thumb_{0}x{0}.png", self.size)
    }
}

/// `<svf dir>/../../images_<svf stem>`, next to the `output/` tree.
pub fn image_dir_for(svf_path: &Path) -> PathBuf {
    let stem = svf_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let output_root = svf_path
        .parent()
        .and_then(Path::parent)
        .and_then(Path::parent)
        .unwrap_or_else(|| Path::new("."));
    output_root.join(format!("images_{stem}"))
}

pub fn render_svf_thumbnail(
    renderer: &Path,
    svf_path: &Path,
    settings: &RenderSettings,
    timeout: Option<Duration>,
) -> Result<Vec<u8>, ExtractionError> {
    let image_dir = image_dir_for(svf_path);
    std::fs::create_dir_all(&image_dir).map_err(|source| ExtractionError::Io {
        path: image_dir.clone(),
        source,
    })?;
    let rendered = image_dir.join(settings.output_file_name());
    clear_output(&rendered)?;

    let mut cmd = ToolCommand::new(renderer)
        .arg(svf_path)
        .arg(format!("-outpath={}", image_dir.display()))
        .arg(format!("-size={}", settings.size))
        .arg(format!("-depth={}", settings.depth))
        .timeout(timeout);
    if let Some(passes) = settings.passes {
        cmd = cmd.arg(format!("-passes={passes}"));
    }

    info!("rendering thumbnail for {}", svf_path.display());
    let output = cmd.run().map_err(|e| tool_error("svf renderer", e))?;
    if !output.success() {
        return Err(ExtractionError::ToolFailed {
            tool: "svf renderer".into(),
            code: output.code(),
            output: output.combined(),
        });
    }

    read_output(&rendered)
}
