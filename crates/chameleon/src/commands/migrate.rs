//! Migration compatibility command.

use std::path::Path;

use anyhow::{Context, Result};

use super::Session;

/// Run the migrate command.
pub async fn run(config_path: &Path, from: &str, to: &str, json: bool) -> Result<()> {
    let session = Session::open(config_path)?;

    let report = session
        .registry
        .check_migration_compatibility(from, to)
        .await
        .with_context(|| format!("Failed to compare {from} and {to}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    tracing::info!(
        "{} -> {}: {:.1}% feature coverage",
        report.from,
        report.to,
        report.coverage_percentage
    );
    if !report.common_features.is_empty() {
        tracing::info!("  shared: {}", report.common_features.join(", "));
    }
    if !report.missing_features.is_empty() {
        tracing::warn!("  missing: {}", report.missing_features.join(", "));
    }

    if report.possible {
        tracing::info!("Migration is possible");
    } else {
        tracing::warn!("Migration is not recommended");
    }

    Ok(())
}
