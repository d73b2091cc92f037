//! Project configuration (chameleon.toml).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chameleon_generator::GenerationOptions;
use serde::Deserialize;

/// Configuration file structure.
#[derive(Debug, Deserialize, Default)]
pub struct ProjectConfig {
    #[serde(default)]
    pub project: ProjectSection,
    #[serde(default)]
    pub generate: GenerateSection,
}

#[derive(Debug, Deserialize)]
pub struct ProjectSection {
    /// Directory holding components/, adapters/ and themes/
    #[serde(default = "default_config_dir")]
    pub config_dir: String,

    /// Output directory for render bundles
    #[serde(default = "default_output")]
    pub output: String,

    /// Target library used when none is given on the command line
    pub library: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateSection {
    #[serde(default)]
    pub typescript: bool,
    pub theme: Option<String>,
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub partition_props: bool,
    #[serde(default = "default_cache")]
    pub cache: bool,
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            output: default_output(),
            library: None,
        }
    }
}

impl Default for GenerateSection {
    fn default() -> Self {
        Self {
            typescript: false,
            theme: None,
            strict: false,
            partition_props: false,
            cache: default_cache(),
        }
    }
}

fn default_config_dir() -> String {
    "chameleon".to_string()
}
fn default_output() -> String {
    "generated".to_string()
}
fn default_cache() -> bool {
    true
}

impl ProjectConfig {
    /// Load configuration from `path` if it exists.
    /// Returns an error if the file exists but is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Config directory, relative to the config file's directory.
    pub fn config_dir(&self, config_path: &Path) -> PathBuf {
        base_dir(config_path).join(&self.project.config_dir)
    }

    /// Output directory, relative to the config file's directory.
    pub fn output_dir(&self, config_path: &Path) -> PathBuf {
        base_dir(config_path).join(&self.project.output)
    }

    /// Generation options from the `[generate]` section.
    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            use_cache: self.generate.cache,
            theme: self.generate.theme.clone(),
            typescript: self.generate.typescript,
            strict: self.generate.strict,
            partition_props: self.generate.partition_props,
            ..Default::default()
        }
    }
}

fn base_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}
