//! Component generation for chameleon.
//!
//! Resolves semantic components against the active adapter, orders batches
//! by their declared dependencies, and caches finished artifacts by
//! fingerprint.

pub mod artifact;
pub mod cache;
pub mod generator;
pub mod optimize;
pub mod resolver;
pub mod theme;

pub use artifact::{
    ArtifactMetadata, ArtifactSink, EventTypeDescriptor, GeneratedArtifact, JsonFileSink,
    PropPartition, PropTypeDescriptor, RenderBundle, SinkError, TypeDescriptors,
};
pub use cache::{CacheStats, Fingerprint, FingerprintInput, GenerationCache};
pub use generator::{BatchResult, ComponentGenerator, ComponentState, GenerateError, GenerationOptions};
pub use resolver::{DependencyResolver, ResolutionPlan, ResolveError};
pub use theme::{JsonThemeProvider, ThemeError, ThemeProvider};
