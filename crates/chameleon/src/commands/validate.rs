//! Definition validation command.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use chameleon_config::{ConfigError, LoadedConfig};

use super::Session;

/// Run the validate command.
pub async fn run(config_path: &Path, paths: Vec<PathBuf>) -> Result<()> {
    let session = Session::open(config_path)?;

    let paths = if paths.is_empty() {
        definition_files(&session.config_dir)
    } else {
        paths
    };

    let mut invalid = 0;
    for path in &paths {
        match session.store.load_config(path) {
            Ok(LoadedConfig::Component(def)) => {
                tracing::info!("✓ component {} ({})", def.name, path.display());
            }
            Ok(LoadedConfig::Adapter(def)) => {
                tracing::info!(
                    "✓ adapter {} {} ({} components)",
                    def.name,
                    def.version,
                    def.components.len()
                );
            }
            Err(ConfigError::Validation { name, report }) => {
                invalid += 1;
                tracing::error!("✗ {} ({})", name, path.display());
                for error in &report.errors {
                    tracing::error!("    {}", error);
                }
                for warning in &report.warnings {
                    tracing::warn!("    {}", warning);
                }
            }
            Err(e) => {
                invalid += 1;
                tracing::error!("✗ {}", e);
            }
        }
    }

    if invalid > 0 {
        bail!("{} of {} definitions are invalid", invalid, paths.len());
    }

    tracing::info!("All {} definitions are valid", paths.len());
    Ok(())
}

/// Definition files under `components/` and `adapters/`, sorted.
fn definition_files(config_dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = ["components", "adapters"]
        .iter()
        .filter_map(|kind| fs::read_dir(config_dir.join(kind)).ok())
        .flat_map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()))
        .filter(|path| {
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            path.is_file() && matches!(ext, "yaml" | "yml" | "json")
        })
        .collect();
    files.sort();
    files
}
