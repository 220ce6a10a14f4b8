use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use shared::config::ClientConfig;

/// Writes a configuration file holding the default values.
///
/// # Arguments
/// * `format` - `yaml`, `yml`, `json` or `toml`.
/// * `output` - Target path; defaults to `chatsync.<format>`.
///
/// # Errors
/// Returns an error if the format is unsupported or if writing the file fails.
pub fn generate_config(format: &str, output: Option<&Path>) -> Result<()> {
    let rendered = ClientConfig::with_defaults()
        .render(format)
        .context("failed to render configuration")?;
    let path = output.map_or_else(|| PathBuf::from(format!("chatsync.{format}")), Path::to_path_buf);

    fs::write(&path, rendered)
        .with_context(|| format!("failed to write {}", path.display()))?;

    println!("Configuration file '{}' generated successfully.", path.display());
    Ok(())
}
