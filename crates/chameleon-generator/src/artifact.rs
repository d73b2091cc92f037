//! Generated artifacts and the handoff to renderers.

use std::fs;
use std::path::{Path, PathBuf};

use chameleon_adapters::{CollisionWarning, ResolvedEvent};
use chameleon_config::{PropMap, PropType, SemanticComponentDefinition};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// A component resolved against one adapter. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedArtifact {
    /// Semantic component name
    pub component: String,

    /// Target library component
    pub tag: String,

    pub props: PropMap,

    /// Static/dynamic split of `props`, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition: Option<PropPartition>,

    /// Events keyed by target event name
    pub events: IndexMap<String, ResolvedEvent>,

    /// Target slot name -> semantic slot name
    pub slots: IndexMap<String, String>,

    pub imports: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub types: Option<TypeDescriptors>,

    /// Opaque theme tokens for this component
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<Value>,

    /// Declared semantic dependencies
    pub dependencies: Vec<String>,

    /// Output format hint for the renderer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    pub metadata: ArtifactMetadata,
}

impl GeneratedArtifact {
    /// The structured bundle handed to a renderer.
    pub fn bundle(&self) -> RenderBundle {
        RenderBundle {
            component: self.component.clone(),
            tag: self.tag.clone(),
            props: self.props.clone(),
            events: self.events.clone(),
            slots: self.slots.clone(),
            imports: self.imports.clone(),
            format: self.format.clone(),
        }
    }
}

/// How an artifact was produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMetadata {
    pub adapter: String,
    pub adapter_version: String,
    pub fingerprint: String,
    pub generated_at: DateTime<Utc>,

    /// Optimization passes that ran
    pub optimizations: Vec<String>,

    /// Output props written by more than one rule (strict mode)
    pub warnings: Vec<CollisionWarning>,
}

/// Props split by whether they can be emitted as literals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropPartition {
    /// Scalars
    pub static_props: PropMap,

    /// Arrays and objects
    pub dynamic_props: PropMap,
}

/// Type information synthesized from a semantic definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeDescriptors {
    pub props: Vec<PropTypeDescriptor>,
    pub events: Vec<EventTypeDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropTypeDescriptor {
    pub name: String,

    /// TypeScript type, e.g. `'primary' | 'secondary'`
    #[serde(rename = "type")]
    pub ts_type: String,

    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventTypeDescriptor {
    pub name: String,

    /// TypeScript handler signature, e.g. `(value: string) => void`
    pub signature: String,
}

impl TypeDescriptors {
    pub fn from_definition(def: &SemanticComponentDefinition) -> Self {
        let props = def
            .props
            .iter()
            .map(|prop| PropTypeDescriptor {
                name: prop.name.clone(),
                ts_type: if prop.options.is_empty() {
                    prop.prop_type.ts_name().to_string()
                } else {
                    literal_union(&prop.options)
                },
                required: prop.required,
            })
            .collect();

        let events = def
            .events
            .iter()
            .map(|event| {
                let params: Vec<String> = event
                    .parameters
                    .iter()
                    .map(|p| format!("{}: {}", p.name, p.param_type.ts_name()))
                    .collect();
                EventTypeDescriptor {
                    name: event.name.clone(),
                    signature: format!("({}) => void", params.join(", ")),
                }
            })
            .collect();

        Self { props, events }
    }
}

fn literal_union(options: &[Value]) -> String {
    options
        .iter()
        .map(|option| match option {
            Value::String(s) => format!("'{}'", s.replace('\'', "\\'")),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Renderer input for one component. Never final text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderBundle {
    pub component: String,
    pub tag: String,
    pub props: PropMap,
    pub events: IndexMap<String, ResolvedEvent>,
    pub slots: IndexMap<String, String>,
    pub imports: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Errors raised while handing a bundle to a sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Failed to write {path}: {message}")]
    Write { path: String, message: String },

    #[error("Failed to serialize bundle for {component}: {message}")]
    Serialize { component: String, message: String },
}

/// Receives finished bundles, typically a renderer.
pub trait ArtifactSink: Send + Sync {
    fn accept(&self, bundle: &RenderBundle) -> Result<(), SinkError>;
}

/// Writes each bundle as pretty JSON to `<dir>/<Component>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a component's bundle is written to.
    pub fn path_for(&self, component: &str) -> PathBuf {
        self.dir.join(format!("{component}.json"))
    }
}

impl ArtifactSink for JsonFileSink {
    fn accept(&self, bundle: &RenderBundle) -> Result<(), SinkError> {
        let path = self.path_for(&bundle.component);
        let write_err = |e: std::io::Error| SinkError::Write {
            path: path.display().to_string(),
            message: e.to_string(),
        };

        let json = serde_json::to_string_pretty(bundle).map_err(|e| SinkError::Serialize {
            component: bundle.component.clone(),
            message: e.to_string(),
        })?;

        fs::create_dir_all(&self.dir).map_err(write_err)?;
        fs::write(&path, json).map_err(write_err)?;

        tracing::debug!(component = %bundle.component, path = %path.display(), "Wrote bundle");
        Ok(())
    }
}
