//! Chameleon CLI - generate library-specific components from semantic definitions.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;
mod watcher;

#[derive(Parser)]
#[command(name = "chameleon")]
#[command(about = "Generate library-specific components from semantic definitions")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to chameleon.toml config file
    #[arg(short, long, default_value = "chameleon.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold a config file, an example component and an example adapter
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },

    /// Generate components with a target library
    Generate {
        /// Components to generate (defaults to every component found)
        components: Vec<String>,

        /// Target library (defaults to the configured one)
        #[arg(short, long)]
        library: Option<String>,

        /// Output directory for render bundles
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report output prop collisions
        #[arg(long)]
        strict: bool,

        /// Synthesize type descriptors
        #[arg(long)]
        typescript: bool,

        /// Theme to attach tokens from
        #[arg(long)]
        theme: Option<String>,

        /// Ignore the artifact cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Validate component and adapter definitions
    Validate {
        /// Files to validate (defaults to everything in the config directory)
        paths: Vec<PathBuf>,
    },

    /// Check how much of one library's feature set another covers
    Migrate {
        /// Library to migrate from
        from: String,

        /// Library to migrate to
        to: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List available adapters and components
    List,

    /// Regenerate whenever definitions change
    Watch {
        /// Target library (defaults to the configured one)
        #[arg(short, long)]
        library: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    // Execute command
    match cli.command {
        Commands::Init { yes } => {
            commands::init::run(&cli.config, yes).await?;
        }
        Commands::Generate {
            components,
            library,
            output,
            strict,
            typescript,
            theme,
            no_cache,
        } => {
            let args = commands::generate::GenerateArgs {
                components,
                library,
                output,
                strict,
                typescript,
                theme,
                no_cache,
            };
            commands::generate::run(&cli.config, args).await?;
        }
        Commands::Validate { paths } => {
            commands::validate::run(&cli.config, paths).await?;
        }
        Commands::Migrate { from, to, json } => {
            commands::migrate::run(&cli.config, &from, &to, json).await?;
        }
        Commands::List => {
            commands::list::run(&cli.config).await?;
        }
        Commands::Watch { library } => {
            commands::watch::run(&cli.config, library).await?;
        }
    }

    Ok(())
}
