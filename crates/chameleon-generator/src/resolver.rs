//! Dependency ordering for component batches.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use chameleon_config::{ConfigError, ConfigurationStore, CycleError, DependencyGraph};

/// Errors from strict resolution.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Cycle(#[from] CycleError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Execution plan for a batch, including everything that went wrong.
#[derive(Debug, Default)]
pub struct ResolutionPlan {
    /// Requested components and their transitive dependencies, dependencies
    /// first
    pub order: Vec<String>,

    /// Direct dependencies per component
    pub dependencies: HashMap<String, Vec<String>>,

    /// Cycles found, in discovery order
    pub cycles: Vec<Vec<String>>,

    /// Components whose definition could not be loaded
    pub missing: HashMap<String, ConfigError>,
}

impl ResolutionPlan {
    /// The first cycle `name` lies on, if any.
    pub fn cycle_of(&self, name: &str) -> Option<&[String]> {
        self.cycles
            .iter()
            .find(|cycle| cycle.iter().any(|n| n == name))
            .map(Vec::as_slice)
    }
}

/// Orders components so that dependencies come before their dependents.
#[derive(Debug, Clone)]
pub struct DependencyResolver {
    store: Arc<ConfigurationStore>,
}

impl DependencyResolver {
    pub fn new(store: Arc<ConfigurationStore>) -> Self {
        Self { store }
    }

    /// Dependencies-first order for `requested` and everything they depend on.
    ///
    /// Fails on the first cycle or the first definition that cannot be loaded.
    pub fn resolve(&self, requested: &[String]) -> Result<Vec<String>, ResolveError> {
        let mut plan = self.plan(requested);

        if let Some(cycle) = plan.cycles.drain(..).next() {
            return Err(CycleError { cycle }.into());
        }
        if let Some(name) = plan.order.iter().find(|n| plan.missing.contains_key(*n)).cloned() {
            if let Some(err) = plan.missing.remove(&name) {
                return Err(err.into());
            }
        }

        Ok(plan.order)
    }

    /// Build a full plan without failing; problems are recorded per component.
    pub fn plan(&self, requested: &[String]) -> ResolutionPlan {
        let mut graph = DependencyGraph::new();
        let mut plan = ResolutionPlan::default();
        let mut seen: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();

        for name in requested {
            if seen.insert(name.clone()) {
                graph.add_node(name);
                queue.push_back(name.clone());
            }
        }

        while let Some(name) = queue.pop_front() {
            let def = match self.store.load_component(&name) {
                Ok(def) => def,
                Err(err) => {
                    tracing::debug!(component = %name, "Cannot resolve component: {}", err);
                    plan.missing.insert(name, err);
                    continue;
                }
            };

            for dep in &def.dependencies {
                graph.add_edge(&name, dep);
                if seen.insert(dep.clone()) {
                    queue.push_back(dep.clone());
                }
            }
            plan.dependencies.insert(name, def.dependencies.clone());
        }

        let traversal = graph.walk();
        for cycle in &traversal.cycles {
            tracing::warn!("Circular component dependency: {}", cycle.join(" -> "));
        }
        plan.order = traversal.order;
        plan.cycles = traversal.cycles;
        plan
    }
}
