//! Initialize chameleon in a project.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::ProjectConfig;

/// Run the init command.
pub async fn run(config_path: &Path, yes: bool) -> Result<()> {
    tracing::info!("Initializing chameleon...");

    // Create default config
    if !config_path.exists() || yes {
        fs::write(config_path, DEFAULT_CONFIG)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        tracing::info!("Created {}", config_path.display());
    } else {
        tracing::warn!("{} already exists. Use --yes to overwrite.", config_path.display());
    }

    let config = ProjectConfig::load(config_path)?;
    let config_dir = config.config_dir(config_path);

    let files = [
        ("components", "Button.yaml", DEFAULT_BUTTON),
        ("adapters", "primevue.yaml", DEFAULT_ADAPTER),
        ("themes", "default.json", DEFAULT_THEME),
    ];

    for (kind, file, content) in files {
        let dir = config_dir.join(kind);
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;

        let path = dir.join(file);
        if !path.exists() || yes {
            fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Created {}", path.display());
        }
    }

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'chameleon generate' to generate components.");

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# Chameleon Configuration

[project]
# Directory containing components/, adapters/ and themes/
config_dir = "chameleon"

# Output directory for render bundles
output = "generated"

# Target library
library = "primevue"

[generate]
# Synthesize type descriptors
typescript = true

# Theme tokens to attach (chameleon/themes/<theme>.json)
theme = "default"

# Report props that overwrite each other
strict = false

# Split props into static and dynamic sets
partition_props = false

# Reuse generated artifacts
cache = true
"#;

const DEFAULT_BUTTON: &str = r#"name: Button
category: form
description: A clickable button.
props:
  - name: label
    type: string
    required: true
  - name: variant
    type: string
    default: primary
    enum: [primary, secondary, danger]
  - name: icon
    type: string
  - name: iconPosition
    type: string
    default: left
    enum: [left, right]
  - name: disabled
    type: boolean
    default: false
events:
  - name: click
    parameters:
      - name: event
        type: object
slots:
  - name: default
"#;

const DEFAULT_ADAPTER: &str = r#"name: primevue
version: 3.2.0
description: PrimeVue component mappings
performance:
  treeShaking: true
compatibility:
  versions: [">=3.0.0"]
  features: [ripple, theming, icons]
components:
  Button:
    target: Button
    import: import Button from 'primevue/button'
    features: [loading]
    props:
      variant:
        type: mapping
        target: severity
        table:
          primary: primary
          secondary: secondary
          danger: danger
      icon:
        type: conditional
        target: icon
        predicate:
          prop: iconPosition
          operator: "==="
          value: right
        trueValue:
          iconPos: right
          icon: $value
        falseValue:
          iconPos: left
          icon: $value
    events:
      click: click
    slots:
      default: default
"#;

const DEFAULT_THEME: &str = r#"{
  "components": {
    "Button": {
      "borderRadius": "6px",
      "paddingX": "1rem",
      "paddingY": "0.5rem"
    }
  }
}
"#;
