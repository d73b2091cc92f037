//! Component generation command.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Result};
use chameleon_generator::BatchResult;

use super::Session;

/// Command-line overrides for a generation run.
#[derive(Debug, Default)]
pub struct GenerateArgs {
    pub components: Vec<String>,
    pub library: Option<String>,
    pub output: Option<PathBuf>,
    pub strict: bool,
    pub typescript: bool,
    pub theme: Option<String>,
    pub no_cache: bool,
}

/// Run the generate command.
pub async fn run(config_path: &Path, args: GenerateArgs) -> Result<()> {
    let start = Instant::now();
    let session = Session::open(config_path)?;
    let library = session.activate(args.library.as_deref()).await?;

    let mut options = session.config.generation_options();
    options.strict |= args.strict;
    options.typescript |= args.typescript;
    options.use_cache &= !args.no_cache;
    if args.theme.is_some() {
        options.theme = args.theme;
    }

    let components = if args.components.is_empty() {
        session.all_components()?
    } else {
        args.components
    };

    let output = args
        .output
        .unwrap_or_else(|| session.config.output_dir(config_path));
    tracing::info!("Generating {} components with {}...", components.len(), library);

    let generator = session.generator(output.clone());
    let result = generator.generate_batch(&components, &options).await;
    report(&result);

    tracing::info!(
        "Generated {} components in {}ms",
        result.done.len(),
        start.elapsed().as_millis()
    );
    tracing::info!("Output: {}", output.display());

    if !result.is_success() {
        bail!(
            "{} components failed, {} skipped",
            result.failed.len(),
            result.skipped.len()
        );
    }

    Ok(())
}

/// Log per-component outcomes of a batch.
pub fn report(result: &BatchResult) {
    for (name, artifact) in &result.done {
        tracing::info!("  {} -> {}", name, artifact.tag);
        for warning in &artifact.metadata.warnings {
            tracing::warn!("  {}", warning);
        }
    }
    for (name, err) in &result.failed {
        tracing::error!("  {} failed: {}", name, err);
    }
    for (name, err) in &result.skipped {
        tracing::warn!("  {} skipped: {}", name, err);
    }
}
