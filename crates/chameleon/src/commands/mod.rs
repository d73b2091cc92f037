//! CLI commands.

pub mod generate;
pub mod init;
pub mod list;
pub mod migrate;
pub mod validate;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chameleon_adapters::{AdapterRegistry, FunctionRegistry, LibrarySwitch};
use chameleon_config::ConfigurationStore;
use chameleon_generator::{ComponentGenerator, JsonFileSink, JsonThemeProvider};

use crate::config::ProjectConfig;

/// Store, registry and generator wired for one project.
pub struct Session {
    pub config: ProjectConfig,
    pub config_dir: PathBuf,
    pub store: Arc<ConfigurationStore>,
    pub registry: Arc<AdapterRegistry>,
}

impl Session {
    /// Load the project config and open its config directory.
    pub fn open(config_path: &Path) -> Result<Self> {
        let config = ProjectConfig::load(config_path)?;
        let config_dir = config.config_dir(config_path);
        if !config_dir.is_dir() {
            bail!(
                "Config directory {} not found. Run 'chameleon init' first.",
                config_dir.display()
            );
        }

        let store = Arc::new(ConfigurationStore::new(&config_dir));
        let registry = Arc::new(AdapterRegistry::new(
            Arc::clone(&store),
            Arc::new(FunctionRegistry::with_builtins()),
        ));

        Ok(Self {
            config,
            config_dir,
            store,
            registry,
        })
    }

    /// Activate `library`, or the configured library when `None`.
    pub async fn activate(&self, library: Option<&str>) -> Result<String> {
        let name = library
            .or(self.config.project.library.as_deref())
            .context("No target library given; pass --library or set project.library")?;

        match self.registry.set_current_library(name).await? {
            LibrarySwitch::Switched { adapter } => Ok(adapter),
            LibrarySwitch::FellBack { active, reason } => {
                bail!("Failed to activate {name} (still using {active}): {reason}")
            }
        }
    }

    /// Generator writing bundles to `output`.
    pub fn generator(&self, output: PathBuf) -> ComponentGenerator {
        ComponentGenerator::new(Arc::clone(&self.registry))
            .with_theme_provider(Arc::new(JsonThemeProvider::new(self.config_dir.join("themes"))))
            .with_sink(Arc::new(JsonFileSink::new(output)))
    }

    /// Every component found under the config directory.
    pub fn all_components(&self) -> Result<Vec<String>> {
        let count = self
            .store
            .scan()
            .context("Failed to scan components")?;
        tracing::debug!("Found {} components", count);
        Ok(self.store.component_names())
    }
}
