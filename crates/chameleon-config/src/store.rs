//! Configuration store for semantic components and adapter definitions.
//!
//! Definitions live under a config directory:
//!
//! ```text
//! <root>/components/Button.yaml
//! <root>/adapters/vuetify.yaml
//! ```
//!
//! YAML (`.yaml`, `.yml`) and JSON (`.json`) are both accepted. Definitions
//! can also be registered in memory, which is how tests and embedders use the
//! store without a directory.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use walkdir::WalkDir;

use crate::adapter::AdapterDefinition;
use crate::definition::SemanticComponentDefinition;
use crate::validate::{validate_adapter, validate_component, ValidationReport};

const EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// A parsed configuration document.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedConfig {
    Component(SemanticComponentDefinition),
    Adapter(AdapterDefinition),
}

impl LoadedConfig {
    pub fn name(&self) -> &str {
        match self {
            LoadedConfig::Component(def) => &def.name,
            LoadedConfig::Adapter(def) => &def.name,
        }
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration not found: {0}")]
    NotFound(String),

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid configuration '{name}': {}", .report.errors.join("; "))]
    Validation {
        name: String,
        report: ValidationReport,
    },

    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("Config directory not found: {0}")]
    DirectoryNotFound(String),
}

/// Loads, validates and holds definitions.
#[derive(Debug, Default)]
pub struct ConfigurationStore {
    /// Config directory, if definitions are file backed
    root: Option<PathBuf>,

    /// Loaded semantic components by name
    components: RwLock<HashMap<String, Arc<SemanticComponentDefinition>>>,

    /// Adapter definitions registered in memory by name
    adapters: RwLock<HashMap<String, AdapterDefinition>>,

    /// Reload counter per component
    epochs: RwLock<HashMap<String, u64>>,
}

impl ConfigurationStore {
    /// Create a store backed by a config directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            ..Self::default()
        }
    }

    /// Create a store without a backing directory.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Config directory, if any.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Register (or replace) a semantic component.
    ///
    /// Replacing an existing definition counts as a reload and bumps its epoch.
    pub fn add_component(&self, def: SemanticComponentDefinition) -> Result<(), ConfigError> {
        ensure_valid(&def.name, validate_component(&def))?;

        let name = def.name.clone();
        let mut components = self.components.write();
        if components.insert(name.clone(), Arc::new(def)).is_some() {
            self.bump_epoch(&name);
        }
        Ok(())
    }

    /// Register (or replace) an adapter definition in memory.
    pub fn add_adapter(&self, def: AdapterDefinition) {
        self.adapters.write().insert(def.name.clone(), def);
    }

    /// Load a semantic component by name.
    pub fn load_component(&self, name: &str) -> Result<Arc<SemanticComponentDefinition>, ConfigError> {
        if let Some(def) = self.components.read().get(name) {
            return Ok(Arc::clone(def));
        }

        let path = self
            .find_file("components", name)
            .ok_or_else(|| ConfigError::NotFound(format!("component {name}")))?;
        let def = read_component(&path, name)?;

        let def = Arc::new(def);
        self.components
            .write()
            .entry(name.to_string())
            .or_insert_with(|| Arc::clone(&def));
        tracing::debug!(component = %name, path = %path.display(), "Loaded component");

        Ok(def)
    }

    /// Load a component together with the epoch of that exact definition.
    pub fn load_component_versioned(
        &self,
        name: &str,
    ) -> Result<(Arc<SemanticComponentDefinition>, u64), ConfigError> {
        let loaded = self.load_component(name)?;

        // Writers bump the epoch while holding the write lock.
        let components = self.components.read();
        let def = components.get(name).map(Arc::clone).unwrap_or(loaded);
        Ok((def, self.component_epoch(name)))
    }

    /// Already loaded component, without touching the file system.
    pub fn cached_component(&self, name: &str) -> Option<Arc<SemanticComponentDefinition>> {
        self.components.read().get(name).cloned()
    }

    /// Reload a component from disk, bumping its epoch.
    ///
    /// The previous definition stays in place if the reload fails.
    pub fn reload_component(&self, name: &str) -> Result<Arc<SemanticComponentDefinition>, ConfigError> {
        let path = self
            .find_file("components", name)
            .ok_or_else(|| ConfigError::NotFound(format!("component {name}")))?;
        let def = Arc::new(read_component(&path, name)?);

        let epoch = {
            let mut components = self.components.write();
            components.insert(name.to_string(), Arc::clone(&def));
            self.bump_epoch(name)
        };
        tracing::info!(component = %name, epoch, "Reloaded component");

        Ok(def)
    }

    /// Current reload epoch of a component (0 until first reload).
    pub fn component_epoch(&self, name: &str) -> u64 {
        self.epochs.read().get(name).copied().unwrap_or(0)
    }

    fn bump_epoch(&self, name: &str) -> u64 {
        let mut epochs = self.epochs.write();
        let epoch = epochs.entry(name.to_string()).or_insert(0);
        *epoch += 1;
        *epoch
    }

    /// Load an adapter definition by name, in-memory registrations first.
    ///
    /// The definition is parsed fresh from disk on every call; callers that
    /// need a stable instance keep the validated adapter around.
    pub fn load_adapter_definition(&self, name: &str) -> Result<AdapterDefinition, ConfigError> {
        if let Some(def) = self.adapters.read().get(name) {
            return Ok(def.clone());
        }

        let path = self
            .find_file("adapters", name)
            .ok_or_else(|| ConfigError::NotFound(format!("adapter {name}")))?;
        let source = read_file(&path)?;
        let def: AdapterDefinition = parse_document(&path, &source)?;

        if !def.name.is_empty() && def.name != name {
            return Err(ConfigError::Validation {
                name: name.to_string(),
                report: ValidationReport {
                    errors: vec![format!("{} declares adapter name '{}'", path.display(), def.name)],
                    warnings: vec![],
                },
            });
        }

        Ok(def)
    }

    /// Load and validate any configuration document.
    ///
    /// Documents with a `components` (or `componentMappings`) key are adapters;
    /// everything else is a semantic component.
    pub fn load_config(&self, path: &Path) -> Result<LoadedConfig, ConfigError> {
        let source = read_file(path)?;
        let value: serde_json::Value = parse_document(path, &source)?;

        let is_adapter = value
            .as_object()
            .is_some_and(|o| o.contains_key("components") || o.contains_key("componentMappings"));

        let config = if is_adapter {
            let def: AdapterDefinition = from_value(path, value)?;
            LoadedConfig::Adapter(def)
        } else {
            let def: SemanticComponentDefinition = from_value(path, value)?;
            LoadedConfig::Component(def)
        };

        let report = self.validate(&config);
        for warning in &report.warnings {
            tracing::warn!(path = %path.display(), "{}", warning);
        }
        ensure_valid(config.name(), report)?;

        Ok(config)
    }

    /// Validate a loaded document.
    ///
    /// Adapter mappings are checked against the semantic components this
    /// store can load; components that cannot be loaded skip the
    /// source-existence checks.
    pub fn validate(&self, config: &LoadedConfig) -> ValidationReport {
        match config {
            LoadedConfig::Component(def) => validate_component(def),
            LoadedConfig::Adapter(def) => validate_adapter(def, |name| self.load_component(name).ok()),
        }
    }

    /// Load every component definition under `<root>/components`.
    ///
    /// Files that fail to parse or validate are skipped with a warning.
    pub fn scan(&self) -> Result<usize, ConfigError> {
        let dir = self.subdir("components")?;
        let mut count = 0;

        for entry in WalkDir::new(&dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() || !has_config_extension(path) {
                continue;
            }

            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
            let def = match read_component(path, "") {
                Ok(def) => def,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            if !stem.eq_ignore_ascii_case(&def.name) {
                tracing::warn!(
                    "Component {} is defined in {}; file name does not match",
                    def.name,
                    path.display()
                );
            }

            self.components
                .write()
                .insert(def.name.clone(), Arc::new(def));
            count += 1;
        }

        Ok(count)
    }

    /// Names of loaded components, sorted.
    pub fn component_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.components.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Adapters available in memory or under `<root>/adapters`, sorted.
    pub fn adapter_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.adapters.read().keys().cloned().collect();

        if let Ok(dir) = self.subdir("adapters") {
            if let Ok(entries) = fs::read_dir(dir) {
                for entry in entries.filter_map(|e| e.ok()) {
                    let path = entry.path();
                    if !has_config_extension(&path) {
                        continue;
                    }
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        names.push(stem.to_string());
                    }
                }
            }
        }

        names.sort();
        names.dedup();
        names
    }

    fn subdir(&self, kind: &str) -> Result<PathBuf, ConfigError> {
        let root = self
            .root
            .as_ref()
            .ok_or_else(|| ConfigError::DirectoryNotFound("<in-memory>".to_string()))?;
        let dir = root.join(kind);
        if !dir.is_dir() {
            return Err(ConfigError::DirectoryNotFound(dir.display().to_string()));
        }
        Ok(dir)
    }

    /// Find `<root>/<kind>/<name>.<ext>`, also trying the lowercase name.
    fn find_file(&self, kind: &str, name: &str) -> Option<PathBuf> {
        let dir = self.root.as_ref()?.join(kind);
        let lower = name.to_lowercase();

        let found = [name, lower.as_str()].into_iter().find_map(|stem| {
            EXTENSIONS
                .iter()
                .map(|ext| dir.join(format!("{stem}.{ext}")))
                .find(|p| p.is_file())
        });
        found
    }
}

fn has_config_extension(path: &Path) -> bool {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    EXTENSIONS.contains(&ext)
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Read and validate a component file. An empty `expected` skips the name check.
fn read_component(path: &Path, expected: &str) -> Result<SemanticComponentDefinition, ConfigError> {
    let source = read_file(path)?;
    let def: SemanticComponentDefinition = parse_document(path, &source)?;

    let mut report = validate_component(&def);
    if !expected.is_empty() && def.name != expected {
        report.error(format!(
            "{} declares component '{}', expected '{}'",
            path.display(),
            def.name,
            expected
        ));
    }
    ensure_valid(&def.name, report)?;

    Ok(def)
}

/// Parse a YAML or JSON document, choosing the format by extension.
pub fn parse_document<T: DeserializeOwned>(path: &Path, source: &str) -> Result<T, ConfigError> {
    let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");

    let parsed = if is_json {
        serde_json::from_str(source).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(source).map_err(|e| e.to_string())
    };

    parsed.map_err(|message| ConfigError::Parse {
        path: path.display().to_string(),
        message,
    })
}

fn from_value<T: DeserializeOwned>(path: &Path, value: serde_json::Value) -> Result<T, ConfigError> {
    serde_json::from_value(value).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn ensure_valid(name: &str, report: ValidationReport) -> Result<(), ConfigError> {
    if report.valid() {
        Ok(())
    } else {
        Err(ConfigError::Validation {
            name: name.to_string(),
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const BUTTON: &str = r#"
name: Button
category: form
props:
  - name: variant
    type: string
    default: primary
events:
  - name: click
"#;

    const ADAPTER: &str = r#"
name: primevue
version: 3.50.0
components:
  Button:
    target: Button
    import: "import Button from 'primevue/button'"
    props:
      variant:
        type: mapping
        target: severity
        table:
          primary: primary
      tone:
        type: direct
        target: tone
"#;

    fn config_dir() -> tempfile::TempDir {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("components")).unwrap();
        fs::create_dir_all(temp.path().join("adapters")).unwrap();
        fs::write(temp.path().join("components/Button.yaml"), BUTTON).unwrap();
        fs::write(temp.path().join("adapters/primevue.yaml"), ADAPTER).unwrap();
        temp
    }

    #[test]
    fn loads_component_from_disk() {
        let temp = config_dir();
        let store = ConfigurationStore::new(temp.path());

        let def = store.load_component("Button").unwrap();

        assert_eq!(def.name, "Button");
        assert_eq!(def.props.len(), 1);
        assert!(store.cached_component("Button").is_some());
    }

    #[test]
    fn missing_component_is_not_found() {
        let temp = config_dir();
        let store = ConfigurationStore::new(temp.path());

        let result = store.load_component("Dialog");

        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn malformed_component_is_parse_error() {
        let temp = config_dir();
        fs::write(temp.path().join("components/Card.yaml"), "name: [unclosed").unwrap();
        let store = ConfigurationStore::new(temp.path());

        let result = store.load_component("Card");

        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn finds_lowercase_file_names() {
        let temp = config_dir();
        fs::write(
            temp.path().join("components/datepicker.yml"),
            "name: DatePicker\nprops:\n  - name: value\n    type: string\n",
        )
        .unwrap();
        let store = ConfigurationStore::new(temp.path());

        let def = store.load_component("DatePicker").unwrap();

        assert_eq!(def.name, "DatePicker");
    }

    #[test]
    fn loads_json_adapter() {
        let temp = config_dir();
        fs::write(
            temp.path().join("adapters/vuetify.json"),
            r#"{"name": "vuetify", "version": "3.4.0", "components": {}}"#,
        )
        .unwrap();
        let store = ConfigurationStore::new(temp.path());

        let def = store.load_adapter_definition("vuetify").unwrap();

        assert_eq!(def.version, "3.4.0");
    }

    #[test]
    fn load_config_detects_adapters_and_reports_warnings() {
        let temp = config_dir();
        let store = ConfigurationStore::new(temp.path());

        let config = store
            .load_config(&temp.path().join("adapters/primevue.yaml"))
            .unwrap();

        assert!(matches!(config, LoadedConfig::Adapter(_)));
        let report = store.validate(&config);
        assert!(report.valid());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("'tone'"));
    }

    #[test]
    fn load_config_rejects_invalid_component() {
        let temp = config_dir();
        let path = temp.path().join("components/bad.yaml");
        fs::write(&path, "name: bad-name\n").unwrap();
        let store = ConfigurationStore::new(temp.path());

        let result = store.load_config(&path);

        match result {
            Err(ConfigError::Validation { report, .. }) => assert_eq!(report.errors.len(), 1),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn reload_bumps_epoch() {
        let temp = config_dir();
        let store = ConfigurationStore::new(temp.path());
        store.load_component("Button").unwrap();
        assert_eq!(store.component_epoch("Button"), 0);

        fs::write(
            temp.path().join("components/Button.yaml"),
            BUTTON.replace("primary", "secondary"),
        )
        .unwrap();
        let def = store.reload_component("Button").unwrap();

        assert_eq!(store.component_epoch("Button"), 1);
        assert_eq!(def.props[0].default, Some(serde_json::json!("secondary")));
    }

    #[test]
    fn versioned_load_pairs_definition_with_epoch() {
        let temp = config_dir();
        let store = ConfigurationStore::new(temp.path());

        let (first, epoch) = store.load_component_versioned("Button").unwrap();
        assert_eq!((first.props.len(), epoch), (1, 0));

        fs::write(
            temp.path().join("components/Button.yaml"),
            "name: Button\nprops:\n  - name: variant\n    type: string\n  - name: size\n    type: string\n",
        )
        .unwrap();
        store.reload_component("Button").unwrap();

        let (second, epoch) = store.load_component_versioned("Button").unwrap();
        assert_eq!((second.props.len(), epoch), (2, 1));
    }

    #[test]
    fn failed_reload_keeps_previous_definition() {
        let temp = config_dir();
        let store = ConfigurationStore::new(temp.path());
        store.load_component("Button").unwrap();

        fs::write(temp.path().join("components/Button.yaml"), "name: [").unwrap();

        assert!(store.reload_component("Button").is_err());
        assert_eq!(store.component_epoch("Button"), 0);
        assert!(store.cached_component("Button").is_some());
    }

    #[test]
    fn scans_components_directory() {
        let temp = config_dir();
        fs::write(temp.path().join("components/broken.yaml"), "props: 3").unwrap();
        fs::write(temp.path().join("components/notes.txt"), "ignored").unwrap();
        let store = ConfigurationStore::new(temp.path());

        let count = store.scan().unwrap();

        assert_eq!(count, 1);
        assert_eq!(store.component_names(), vec!["Button"]);
    }

    #[test]
    fn lists_adapters_from_disk_and_memory() {
        let temp = config_dir();
        let store = ConfigurationStore::new(temp.path());
        store.add_adapter(AdapterDefinition {
            name: "antd".to_string(),
            ..Default::default()
        });

        assert_eq!(store.adapter_names(), vec!["antd", "primevue"]);
    }

    #[test]
    fn in_memory_replacement_bumps_epoch() {
        let store = ConfigurationStore::in_memory();
        store
            .add_component(SemanticComponentDefinition::new("Icon"))
            .unwrap();
        store
            .add_component(SemanticComponentDefinition::new("Icon"))
            .unwrap();

        assert_eq!(store.component_epoch("Icon"), 1);
        assert!(matches!(store.scan(), Err(ConfigError::DirectoryNotFound(_))));
    }
}
