//! Adapter registry.
//!
//! Loads adapters on demand and tracks which one is active. Concurrent loads
//! of the same adapter share a single in-flight initialization, so each
//! adapter definition is parsed and validated once until it is reloaded.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chameleon_config::{ConfigError, ConfigurationStore};
use parking_lot::{Mutex, RwLock};
use tokio::sync::OnceCell;

use crate::adapter::{Adapter, AdapterError};
use crate::functions::FunctionRegistry;
use crate::migration::MigrationReport;

/// Errors that can occur in the adapter registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error("No adapter is active")]
    NoActiveAdapter,

    #[error("Failed to load adapter '{adapter}' and no previous adapter is active: {reason}")]
    NoFallback { adapter: String, reason: String },

    #[error("Adapter load task failed: {0}")]
    Task(String),
}

/// Outcome of switching the active library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibrarySwitch {
    /// The requested adapter is now active
    Switched { adapter: String },

    /// Loading failed; the previously active adapter stays active
    FellBack { active: String, reason: String },
}

type Slot = Arc<OnceCell<Arc<Adapter>>>;

/// Loaded adapters and the active one.
#[derive(Debug)]
pub struct AdapterRegistry {
    store: Arc<ConfigurationStore>,
    functions: Arc<FunctionRegistry>,

    /// One initialization cell per adapter name
    slots: Mutex<HashMap<String, Slot>>,

    current: RwLock<Option<Arc<Adapter>>>,

    /// Last epoch handed out per adapter, including failed reloads
    issued: Mutex<HashMap<String, u64>>,

    /// Number of adapter builds performed
    loads: AtomicUsize,
}

impl AdapterRegistry {
    pub fn new(store: Arc<ConfigurationStore>, functions: Arc<FunctionRegistry>) -> Self {
        Self {
            store,
            functions,
            slots: Mutex::new(HashMap::new()),
            current: RwLock::new(None),
            issued: Mutex::new(HashMap::new()),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn store(&self) -> &Arc<ConfigurationStore> {
        &self.store
    }

    pub fn functions(&self) -> &Arc<FunctionRegistry> {
        &self.functions
    }

    /// Load an adapter, building it at most once.
    ///
    /// A failed build leaves nothing behind; the next call retries.
    pub async fn load_adapter(&self, name: &str) -> Result<Arc<Adapter>, RegistryError> {
        let slot = self.slot(name);
        let adapter = slot
            .get_or_try_init(|| self.build(name, self.issued_epoch(name)))
            .await?;
        Ok(Arc::clone(adapter))
    }

    /// Make `name` the active adapter.
    ///
    /// If loading fails while another adapter is active, that adapter stays
    /// active and the failure is reported through [`LibrarySwitch::FellBack`].
    /// Failing with no active adapter is fatal.
    pub async fn set_current_library(&self, name: &str) -> Result<LibrarySwitch, RegistryError> {
        match self.load_adapter(name).await {
            Ok(adapter) => {
                *self.current.write() = Some(adapter);
                tracing::info!(adapter = %name, "Active library switched");
                Ok(LibrarySwitch::Switched {
                    adapter: name.to_string(),
                })
            }
            Err(err) => {
                let previous = self.current.read().as_ref().map(|a| a.name().to_string());
                match previous {
                    Some(active) => {
                        tracing::warn!(
                            adapter = %name,
                            active = %active,
                            "Failed to load adapter, keeping the active one: {}",
                            err
                        );
                        Ok(LibrarySwitch::FellBack {
                            active,
                            reason: err.to_string(),
                        })
                    }
                    None => Err(RegistryError::NoFallback {
                        adapter: name.to_string(),
                        reason: err.to_string(),
                    }),
                }
            }
        }
    }

    /// The active adapter.
    pub fn current(&self) -> Result<Arc<Adapter>, RegistryError> {
        self.current
            .read()
            .as_ref()
            .map(Arc::clone)
            .ok_or(RegistryError::NoActiveAdapter)
    }

    pub fn is_adapter_loaded(&self, name: &str) -> bool {
        self.slots
            .lock()
            .get(name)
            .is_some_and(|slot| slot.initialized())
    }

    /// Names of loaded adapters, sorted.
    pub fn get_loaded_adapters(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .slots
            .lock()
            .iter()
            .filter(|(_, slot)| slot.initialized())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Rebuild an adapter from its current definition.
    ///
    /// The old instance, and its memo, is replaced only once the new one has
    /// validated. The new instance carries a fresh epoch, so artifacts
    /// fingerprinted against the old instance are no longer reachable.
    pub async fn reload_adapter(&self, name: &str) -> Result<Arc<Adapter>, RegistryError> {
        let epoch = {
            let mut issued = self.issued.lock();
            let epoch = issued.entry(name.to_string()).or_insert(0);
            *epoch += 1;
            *epoch
        };
        let adapter = self.build(name, epoch).await?;

        self.slots.lock().insert(
            name.to_string(),
            Arc::new(OnceCell::new_with(Some(Arc::clone(&adapter)))),
        );

        let mut current = self.current.write();
        if current.as_ref().is_some_and(|a| a.name() == name) {
            *current = Some(Arc::clone(&adapter));
        }

        tracing::info!(adapter = %name, epoch, "Adapter reloaded");
        Ok(adapter)
    }

    /// Epoch of the loaded instance of an adapter; zero until the first
    /// successful reload.
    pub fn epoch(&self, name: &str) -> u64 {
        self.slots
            .lock()
            .get(name)
            .and_then(|slot| slot.get().map(|adapter| adapter.epoch()))
            .unwrap_or(0)
    }

    fn issued_epoch(&self, name: &str) -> u64 {
        self.issued.lock().get(name).copied().unwrap_or(0)
    }

    /// Number of adapter builds performed so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Feature coverage of `to` relative to `from`.
    pub async fn check_migration_compatibility(
        &self,
        from: &str,
        to: &str,
    ) -> Result<MigrationReport, RegistryError> {
        let source = self.load_adapter(from).await?;
        let target = self.load_adapter(to).await?;

        Ok(MigrationReport::between(
            source.name(),
            &source.features(),
            target.name(),
            &target.features(),
        ))
    }

    fn slot(&self, name: &str) -> Slot {
        Arc::clone(
            self.slots
                .lock()
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new())),
        )
    }

    async fn build(&self, name: &str, epoch: u64) -> Result<Arc<Adapter>, RegistryError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(adapter = %name, epoch, "Loading adapter");

        let store = Arc::clone(&self.store);
        let functions = Arc::clone(&self.functions);
        let name = name.to_string();

        let adapter = tokio::task::spawn_blocking(move || -> Result<Adapter, RegistryError> {
            let def = store.load_adapter_definition(&name)?;
            let adapter =
                Adapter::with_components(def, functions, |component| store.load_component(component).ok())?;
            Ok(adapter.with_epoch(epoch))
        })
        .await
        .map_err(|e| RegistryError::Task(e.to_string()))??;

        Ok(Arc::new(adapter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chameleon_config::{AdapterDefinition, ComponentMapping, TransformationRule};
    use serde_json::json;

    fn definition(name: &str, features: &[&str]) -> AdapterDefinition {
        let mut def = AdapterDefinition {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            ..Default::default()
        };
        def.compatibility.features = features.iter().map(|f| (*f).to_string()).collect();
        def.components.insert(
            "Button".to_string(),
            ComponentMapping::new("Button", &format!("import Button from '{name}/button'")).with_rule(
                "variant",
                TransformationRule::mapping("severity", &[("primary", json!("primary"))], None),
            ),
        );
        def
    }

    fn registry(defs: Vec<AdapterDefinition>) -> AdapterRegistry {
        let store = ConfigurationStore::in_memory();
        for def in defs {
            store.add_adapter(def);
        }
        AdapterRegistry::new(Arc::new(store), Arc::new(FunctionRegistry::with_builtins()))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_loads_build_once() {
        let registry = Arc::new(registry(vec![definition("primevue", &[])]));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.load_adapter("primevue").await.map(|a| a.name().to_string()) })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "primevue");
        }
        assert_eq!(registry.load_count(), 1);
        assert!(registry.is_adapter_loaded("primevue"));
    }

    #[tokio::test]
    async fn failed_load_is_retried() {
        let registry = registry(vec![]);

        assert!(registry.load_adapter("vuetify").await.is_err());
        assert!(!registry.is_adapter_loaded("vuetify"));

        registry.store().add_adapter(definition("vuetify", &[]));
        assert!(registry.load_adapter("vuetify").await.is_ok());
        assert_eq!(registry.load_count(), 2);
    }

    #[tokio::test]
    async fn switch_without_fallback_is_fatal() {
        let registry = registry(vec![]);

        let err = registry.set_current_library("vuetify").await.unwrap_err();

        assert!(matches!(err, RegistryError::NoFallback { .. }));
        assert!(matches!(registry.current(), Err(RegistryError::NoActiveAdapter)));
    }

    #[tokio::test]
    async fn failed_switch_keeps_previous_adapter() {
        let registry = registry(vec![definition("primevue", &[])]);

        registry.set_current_library("primevue").await.unwrap();
        let outcome = registry.set_current_library("vuetify").await.unwrap();

        assert!(matches!(outcome, LibrarySwitch::FellBack { ref active, .. } if active == "primevue"));
        assert_eq!(registry.current().unwrap().name(), "primevue");
    }

    #[tokio::test]
    async fn reload_replaces_instance_and_bumps_epoch() {
        let registry = registry(vec![definition("primevue", &[])]);
        registry.set_current_library("primevue").await.unwrap();
        let before = registry.current().unwrap();

        registry.store().add_adapter(definition("primevue", &["ripple"]));
        registry.reload_adapter("primevue").await.unwrap();

        let after = registry.current().unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert!(after.features().contains("ripple"));
        assert_eq!(registry.epoch("primevue"), 1);
        assert_eq!((before.epoch(), after.epoch()), (0, 1));
        assert_eq!(registry.get_loaded_adapters(), vec!["primevue".to_string()]);
    }

    #[tokio::test]
    async fn failed_reload_keeps_old_instance() {
        let registry = registry(vec![definition("primevue", &[])]);
        registry.load_adapter("primevue").await.unwrap();

        let mut broken = definition("primevue", &[]);
        broken.version = "latest".to_string();
        registry.store().add_adapter(broken);

        assert!(registry.reload_adapter("primevue").await.is_err());
        assert!(registry.is_adapter_loaded("primevue"));
        assert_eq!(registry.epoch("primevue"), 0);

        registry.store().add_adapter(definition("primevue", &[]));
        let reloaded = registry.reload_adapter("primevue").await.unwrap();
        assert_eq!(reloaded.epoch(), 2);
    }

    #[tokio::test]
    async fn compares_feature_coverage() {
        let registry = registry(vec![
            definition("vuetify", &["A", "B", "C", "D"]),
            definition("primevue", &["A", "B", "C"]),
        ]);

        let report = registry
            .check_migration_compatibility("vuetify", "primevue")
            .await
            .unwrap();

        assert_eq!(report.coverage_percentage, 75.0);
        assert!(!report.possible);
    }
}
