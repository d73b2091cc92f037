//! Component generation.
//!
//! [`ComponentGenerator::generate`] runs the per-component pipeline against
//! the active adapter:
//!
//! 1. support check and definition lookup
//! 2. prop, event and slot transformation
//! 3. tag and import resolution
//! 4. theme tokens and type descriptors (optional)
//! 5. optimization passes
//! 6. sink handoff and caching
//!
//! [`ComponentGenerator::generate_batch`] runs many components concurrently,
//! each waiting for its dependencies to finish first.

use std::collections::HashMap;
use std::sync::Arc;

use chameleon_adapters::{Adapter, AdapterError, AdapterRegistry, RegistryError};
use chameleon_config::{ConfigError, ConfigurationStore, CycleError, PropMap, SemanticComponentDefinition};
use chrono::Utc;
use indexmap::IndexMap;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::artifact::{ArtifactMetadata, ArtifactSink, GeneratedArtifact, SinkError, TypeDescriptors};
use crate::cache::{Fingerprint, FingerprintInput, GenerationCache};
use crate::optimize;
use crate::resolver::DependencyResolver;
use crate::theme::ThemeProvider;

/// Options for one generation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOptions {
    /// Read and write the artifact cache. Not part of the fingerprint.
    #[serde(skip)]
    pub use_cache: bool,

    /// Theme whose tokens are attached to the artifact
    pub theme: Option<String>,

    /// Synthesize type descriptors
    pub typescript: bool,

    /// Output format hint passed through to the renderer
    pub format: Option<String>,

    /// Report output prop collisions
    pub strict: bool,

    /// Split props into static and dynamic sets
    pub partition_props: bool,

    /// Prop values layered over the definition's defaults
    pub overrides: PropMap,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            theme: None,
            typescript: false,
            format: None,
            strict: false,
            partition_props: false,
            overrides: PropMap::new(),
        }
    }
}

/// Errors that can occur while generating a component.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("Component '{component}' is not supported by adapter '{adapter}'")]
    ComponentNotSupported { component: String, adapter: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error("{component}: {source}")]
    CircularDependency {
        component: String,
        #[source]
        source: CycleError,
    },

    #[error("{component}: dependency '{dependency}' failed")]
    DependencyFailed { component: String, dependency: String },

    #[error("Failed to fingerprint {component}: {message}")]
    Fingerprint { component: String, message: String },

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("Generation task for {component} failed: {message}")]
    Task { component: String, message: String },
}

/// Lifecycle of a component within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentState {
    Pending,
    Resolving,
    Generating,
    Done,
    Failed,
}

impl ComponentState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ComponentState::Done | ComponentState::Failed)
    }
}

/// Outcome of a batch. Entries are in execution order.
#[derive(Debug, Default)]
pub struct BatchResult {
    pub done: IndexMap<String, Arc<GeneratedArtifact>>,
    pub failed: IndexMap<String, GenerateError>,

    /// Components not generated because a dependency failed
    pub skipped: IndexMap<String, GenerateError>,
}

impl BatchResult {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// Drives generation against the registry's active adapter.
#[derive(Clone)]
pub struct ComponentGenerator {
    store: Arc<ConfigurationStore>,
    registry: Arc<AdapterRegistry>,
    cache: Arc<GenerationCache>,
    theme: Option<Arc<dyn ThemeProvider>>,
    sink: Option<Arc<dyn ArtifactSink>>,
}

impl ComponentGenerator {
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Self {
            store: Arc::clone(registry.store()),
            registry,
            cache: Arc::new(GenerationCache::new()),
            theme: None,
            sink: None,
        }
    }

    pub fn with_theme_provider(mut self, provider: Arc<dyn ThemeProvider>) -> Self {
        self.theme = Some(provider);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ArtifactSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn cache(&self) -> &GenerationCache {
        &self.cache
    }

    pub fn registry(&self) -> &Arc<AdapterRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<ConfigurationStore> {
        &self.store
    }

    /// Fingerprint of a request against the active adapter.
    pub fn fingerprint(&self, component: &str, options: &GenerationOptions) -> Result<Fingerprint, GenerateError> {
        let adapter = self.registry.current()?;
        let (_, component_epoch) = self.store.load_component_versioned(component)?;
        fingerprint_for(&adapter, component, component_epoch, options)
    }

    /// Generate one component with the active adapter.
    ///
    /// Unsupported components fail before the cache is consulted, so they
    /// never leave a cache entry behind.
    pub async fn generate(
        &self,
        component: &str,
        options: &GenerationOptions,
    ) -> Result<Arc<GeneratedArtifact>, GenerateError> {
        let adapter = self.registry.current()?;
        if !adapter.is_component_supported(component) {
            return Err(GenerateError::ComponentNotSupported {
                component: component.to_string(),
                adapter: adapter.name().to_string(),
            });
        }

        // Epochs come from the exact adapter and definition this run uses.
        let (def, component_epoch) = self.store.load_component_versioned(component)?;
        let fingerprint = fingerprint_for(&adapter, component, component_epoch, options)?;

        if options.use_cache {
            if let Some(artifact) = self.cache.get(&fingerprint) {
                tracing::debug!(component = %component, fingerprint = %fingerprint, "Cache hit");
                return Ok(artifact);
            }
        }

        tracing::debug!(component = %component, adapter = %adapter.name(), "Generating");
        let artifact = self.run_pipeline(&adapter, &def, options, &fingerprint)?;

        if let Some(sink) = &self.sink {
            sink.accept(&artifact.bundle())?;
        }

        if options.use_cache {
            Ok(self.cache.insert(fingerprint, artifact))
        } else {
            Ok(Arc::new(artifact))
        }
    }

    fn run_pipeline(
        &self,
        adapter: &Adapter,
        def: &SemanticComponentDefinition,
        options: &GenerationOptions,
        fingerprint: &Fingerprint,
    ) -> Result<GeneratedArtifact, GenerateError> {
        let name = def.name.as_str();

        let mut input = def.default_props();
        for (key, value) in &options.overrides {
            input.insert(key.clone(), value.clone());
        }

        let transformed = adapter.transform_props(name, &input, options.strict)?;
        let mut events = adapter.transform_events(name, &def.event_bag())?;
        let slots = adapter.transform_slots(name, &def.slot_names())?;
        tracing::debug!(component = %name, "Transformed props, events and slots");

        let tag = adapter.get_component_mapping(name)?.target.clone();
        let imports = adapter.get_required_imports(name)?;

        let theme = options
            .theme
            .as_deref()
            .and_then(|theme| self.theme_tokens(theme, name));
        let types = options.typescript.then(|| TypeDescriptors::from_definition(def));

        let mut optimizations = Vec::new();
        let mut props = transformed.props;

        let removed = optimize::eliminate_dead_props(&mut props);
        if removed > 0 {
            optimizations.push(optimize::DEAD_PROPS.to_string());
        }

        let partition = options.partition_props.then(|| {
            optimizations.push(optimize::PARTITION.to_string());
            optimize::partition_props(&props)
        });

        let imports = optimize::filter_imports(imports);
        optimizations.push(optimize::IMPORTS.to_string());

        let hints = adapter.get_performance_hints(name)?;
        if optimize::apply_debounce(&mut events, &hints) > 0 {
            optimizations.push(optimize::DEBOUNCE.to_string());
        }

        Ok(GeneratedArtifact {
            component: name.to_string(),
            tag,
            props,
            partition,
            events,
            slots,
            imports,
            types,
            theme,
            dependencies: def.dependencies.clone(),
            format: options.format.clone(),
            metadata: ArtifactMetadata {
                adapter: adapter.name().to_string(),
                adapter_version: adapter.version().to_string(),
                fingerprint: fingerprint.to_string(),
                generated_at: Utc::now(),
                optimizations,
                warnings: transformed.warnings,
            },
        })
    }

    /// Theme failures degrade to no theme data.
    fn theme_tokens(&self, theme: &str, component: &str) -> Option<serde_json::Value> {
        let provider = self.theme.as_ref()?;
        match provider.tokens(theme, component) {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::warn!(component = %component, theme = %theme, "Theme lookup failed: {}", e);
                None
            }
        }
    }

    /// Generate components and everything they depend on.
    ///
    /// A failure never aborts the batch. Components on a dependency cycle
    /// fail with [`GenerateError::CircularDependency`]; components whose
    /// dependency failed are reported under `skipped`.
    pub async fn generate_batch(&self, components: &[String], options: &GenerationOptions) -> BatchResult {
        let mut plan = DependencyResolver::new(Arc::clone(&self.store)).plan(components);

        let mut senders: HashMap<String, watch::Sender<ComponentState>> = HashMap::new();
        let mut receivers: HashMap<String, watch::Receiver<ComponentState>> = HashMap::new();
        for name in &plan.order {
            let (tx, rx) = watch::channel(ComponentState::Pending);
            senders.insert(name.clone(), tx);
            receivers.insert(name.clone(), rx);
        }

        let mut result = BatchResult::default();
        let mut tasks: Vec<(String, JoinHandle<Result<Arc<GeneratedArtifact>, GenerateError>>)> = Vec::new();
        // Senders of components that failed up front stay alive until the end.
        let mut settled: Vec<watch::Sender<ComponentState>> = Vec::new();

        for name in &plan.order {
            let Some(tx) = senders.remove(name) else {
                continue;
            };

            if let Some(cycle) = plan.cycle_of(name) {
                let cycle = cycle.to_vec();
                tx.send_replace(ComponentState::Failed);
                settled.push(tx);
                result.failed.insert(
                    name.clone(),
                    GenerateError::CircularDependency {
                        component: name.clone(),
                        source: CycleError { cycle },
                    },
                );
                continue;
            }

            if let Some(err) = plan.missing.remove(name) {
                tx.send_replace(ComponentState::Failed);
                settled.push(tx);
                result.failed.insert(name.clone(), err.into());
                continue;
            }

            let deps: Vec<(String, watch::Receiver<ComponentState>)> = plan
                .dependencies
                .get(name)
                .into_iter()
                .flatten()
                .filter_map(|dep| receivers.get(dep).map(|rx| (dep.clone(), rx.clone())))
                .collect();

            let generator = self.clone();
            let options = options.clone();
            let component = name.clone();
            let handle = tokio::spawn(async move {
                tx.send_replace(ComponentState::Resolving);

                for (dependency, mut rx) in deps {
                    let state = rx
                        .wait_for(|s| s.is_terminal())
                        .await
                        .map(|s| *s)
                        .unwrap_or(ComponentState::Failed);
                    if state != ComponentState::Done {
                        tx.send_replace(ComponentState::Failed);
                        return Err(GenerateError::DependencyFailed { component, dependency });
                    }
                }

                tx.send_replace(ComponentState::Generating);
                match generator.generate(&component, &options).await {
                    Ok(artifact) => {
                        tx.send_replace(ComponentState::Done);
                        Ok(artifact)
                    }
                    Err(e) => {
                        tracing::warn!(component = %component, "Generation failed: {}", e);
                        tx.send_replace(ComponentState::Failed);
                        Err(e)
                    }
                }
            });
            tasks.push((name.clone(), handle));
        }

        for (name, handle) in tasks {
            match handle.await {
                Ok(Ok(artifact)) => {
                    result.done.insert(name, artifact);
                }
                Ok(Err(err @ GenerateError::DependencyFailed { .. })) => {
                    result.skipped.insert(name, err);
                }
                Ok(Err(err)) => {
                    result.failed.insert(name, err);
                }
                Err(e) => {
                    result.failed.insert(
                        name.clone(),
                        GenerateError::Task {
                            component: name,
                            message: e.to_string(),
                        },
                    );
                }
            }
        }
        drop(settled);

        tracing::info!(
            done = result.done.len(),
            failed = result.failed.len(),
            skipped = result.skipped.len(),
            "Batch finished"
        );
        result
    }
}

fn fingerprint_for(
    adapter: &Adapter,
    component: &str,
    component_epoch: u64,
    options: &GenerationOptions,
) -> Result<Fingerprint, GenerateError> {
    Fingerprint::compute(&FingerprintInput {
        component,
        component_epoch,
        adapter: adapter.name(),
        adapter_version: adapter.version(),
        adapter_epoch: adapter.epoch(),
        options,
    })
    .map_err(|e| GenerateError::Fingerprint {
        component: component.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chameleon_adapters::FunctionRegistry;
    use chameleon_config::{AdapterDefinition, ComponentMapping, PropType, TransformationRule};
    use serde_json::json;

    fn button() -> SemanticComponentDefinition {
        SemanticComponentDefinition::new("Button")
            .with_prop("variant", PropType::String, Some(json!("primary")))
            .with_prop("icon", PropType::String, Some(serde_json::Value::Null))
            .with_event("click")
            .with_slot("default")
    }

    fn primevue() -> AdapterDefinition {
        let mut def = AdapterDefinition {
            name: "primevue".to_string(),
            version: "3.2.0".to_string(),
            ..Default::default()
        };
        def.components.insert(
            "Button".to_string(),
            ComponentMapping::new("Button", "import Button from 'primevue/button'").with_rule(
                "variant",
                TransformationRule::mapping("severity", &[("secondary", json!("outlined"))], None),
            ),
        );
        def
    }

    async fn generator() -> ComponentGenerator {
        let store = ConfigurationStore::in_memory();
        store.add_component(button()).unwrap();
        store.add_adapter(primevue());
        let registry = Arc::new(AdapterRegistry::new(
            Arc::new(store),
            Arc::new(FunctionRegistry::with_builtins()),
        ));
        registry.set_current_library("primevue").await.unwrap();
        ComponentGenerator::new(registry)
    }

    #[tokio::test]
    async fn applies_overrides_over_defaults() {
        let generator = generator().await;
        let options = GenerationOptions {
            overrides: [("variant".to_string(), json!("secondary"))].into_iter().collect(),
            ..Default::default()
        };

        let artifact = generator.generate("Button", &options).await.unwrap();

        assert_eq!(artifact.props["severity"], json!("outlined"));
        assert_eq!(artifact.tag, "Button");
    }

    #[tokio::test]
    async fn drops_null_props() {
        let generator = generator().await;

        let artifact = generator.generate("Button", &GenerationOptions::default()).await.unwrap();

        assert!(!artifact.props.contains_key("icon"));
        assert!(artifact
            .metadata
            .optimizations
            .contains(&optimize::DEAD_PROPS.to_string()));
    }

    #[tokio::test]
    async fn bypasses_cache_when_disabled() {
        let generator = generator().await;
        let options = GenerationOptions {
            use_cache: false,
            ..Default::default()
        };

        generator.generate("Button", &options).await.unwrap();

        assert!(generator.cache().is_empty());
    }

    #[tokio::test]
    async fn use_cache_does_not_change_fingerprint() {
        let generator = generator().await;
        let cached = GenerationOptions::default();
        let uncached = GenerationOptions {
            use_cache: false,
            ..Default::default()
        };

        assert_eq!(
            generator.fingerprint("Button", &cached).unwrap(),
            generator.fingerprint("Button", &uncached).unwrap()
        );
    }

    #[tokio::test]
    async fn component_reload_changes_fingerprint() {
        let generator = generator().await;
        let options = GenerationOptions::default();
        let before = generator.fingerprint("Button", &options).unwrap();

        generator.store().add_component(button()).unwrap();

        assert_ne!(before, generator.fingerprint("Button", &options).unwrap());
    }

    #[tokio::test]
    async fn fingerprint_follows_the_adapter_instance() {
        let generator = generator().await;
        let options = GenerationOptions::default();
        let old = generator.registry().current().unwrap();
        let before = generator.fingerprint("Button", &options).unwrap();

        generator.registry().reload_adapter("primevue").await.unwrap();

        // A run still holding the old instance keys its artifact under the old epoch.
        assert_eq!(fingerprint_for(&old, "Button", 0, &options).unwrap(), before);
        assert_ne!(generator.fingerprint("Button", &options).unwrap(), before);
    }

    #[tokio::test]
    async fn synthesizes_types_on_request() {
        let generator = generator().await;
        let options = GenerationOptions {
            typescript: true,
            partition_props: true,
            ..Default::default()
        };

        let artifact = generator.generate("Button", &options).await.unwrap();

        let types = artifact.types.as_ref().unwrap();
        assert_eq!(types.props.len(), 2);
        assert_eq!(types.events[0].name, "click");
        assert!(artifact.partition.is_some());
    }
}
