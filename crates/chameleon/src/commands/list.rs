//! List adapters and components.

use std::path::Path;

use anyhow::Result;

use super::Session;

/// Run the list command.
pub async fn run(config_path: &Path) -> Result<()> {
    let session = Session::open(config_path)?;

    let adapters = session.store.adapter_names();
    tracing::info!("Adapters ({}):", adapters.len());
    for name in &adapters {
        let marker = if session.config.project.library.as_deref() == Some(name.as_str()) {
            " (default)"
        } else {
            ""
        };
        tracing::info!("  {}{}", name, marker);
    }

    let components = session.all_components()?;
    tracing::info!("Components ({}):", components.len());
    for name in &components {
        let category = session
            .store
            .cached_component(name)
            .map(|def| def.category.clone())
            .unwrap_or_default();
        if category.is_empty() {
            tracing::info!("  {}", name);
        } else {
            tracing::info!("  {} [{}]", name, category);
        }
    }

    Ok(())
}
