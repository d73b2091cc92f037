//! Watch command: regenerate when definitions change.

use std::path::Path;

use anyhow::{Context, Result};
use chameleon_config::LoadedConfig;

use super::generate::report;
use super::Session;
use crate::watcher::{DefinitionWatcher, WatchEvent};

/// Run the watch command.
pub async fn run(config_path: &Path, library: Option<String>) -> Result<()> {
    let session = Session::open(config_path)?;
    let library = session.activate(library.as_deref()).await?;
    let options = session.config.generation_options();
    let generator = session.generator(session.config.output_dir(config_path));

    let components = session.all_components()?;
    let result = generator.generate_batch(&components, &options).await;
    report(&result);

    let (_watcher, mut rx) =
        DefinitionWatcher::new(&session.config_dir).context("Failed to watch config directory")?;
    tracing::info!(
        "Watching {} for changes (library: {})",
        session.config_dir.display(),
        library
    );

    while let Some(event) = rx.recv().await {
        let changed = match &event {
            WatchEvent::Component(path) => reload_component(&session, path),
            WatchEvent::Adapter(path) => reload_adapter(&session, path).await,
            WatchEvent::Theme(path) => {
                tracing::info!("Theme changed: {} (restart to pick it up)", path.display());
                false
            }
            WatchEvent::Removed(path) => {
                tracing::warn!("Removed {}; keeping the loaded definition", path.display());
                false
            }
        };
        if !changed {
            continue;
        }

        let components = session.store.component_names();
        let result = generator.generate_batch(&components, &options).await;
        report(&result);
        let stats = generator.cache().stats();
        tracing::info!(
            "Regenerated {} components ({} cache hits, {} entries)",
            result.done.len(),
            stats.hits,
            stats.entries
        );
    }

    Ok(())
}

fn reload_component(session: &Session, path: &Path) -> bool {
    let name = match session.store.load_config(path) {
        Ok(LoadedConfig::Component(def)) => def.name,
        Ok(LoadedConfig::Adapter(def)) => {
            tracing::warn!("{} defines adapter {} inside components/", path.display(), def.name);
            return false;
        }
        Err(e) => {
            tracing::error!("{}", e);
            return false;
        }
    };

    match session.store.reload_component(&name) {
        Ok(_) => true,
        Err(e) => {
            tracing::error!("Failed to reload {}: {}", name, e);
            false
        }
    }
}

async fn reload_adapter(session: &Session, path: &Path) -> bool {
    let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
        return false;
    };

    match session.registry.reload_adapter(name).await {
        Ok(adapter) => {
            tracing::info!("Reloaded adapter {} {}", adapter.name(), adapter.version());
            true
        }
        Err(e) => {
            tracing::error!("Failed to reload adapter {}: {}", name, e);
            false
        }
    }
}
