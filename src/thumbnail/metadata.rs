use super::{clear_output, read_output, tool_error};
use crate::error::ExtractionError;
use crate::process::ToolCommand;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Runs `extractor --icv <output> <source>` and returns the JPEG it wrote.
pub fn extract_metadata_thumbnail(
    extractor: &Path,
    source: &Path,
    output: &Path,
    timeout: Option<Duration>,
) -> Result<Vec<u8>, ExtractionError> {
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ExtractionError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    clear_output(output)?;

    info!("extracting embedded preview from {}", source.display());
    let result = ToolCommand::new(extractor)
        .arg("--icv")
        .arg(output)
        .arg(source)
        .timeout(timeout)
        .run()
        .map_err(|e| tool_error("metadata extractor", e))?;

    if !result.success() {
        return Err(ExtractionError::ToolFailed {
            tool: "metadata extractor".into(),
            code: result.code(),
            output: result.combined(),
        });
    }

    read_output(output)
}
