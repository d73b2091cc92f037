//! Artifact cache keyed by request fingerprints.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chameleon_config::to_canonical_string;
use parking_lot::RwLock;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::artifact::GeneratedArtifact;

/// Everything a generated artifact depends on.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintInput<'a, O: Serialize> {
    pub component: &'a str,
    pub component_epoch: u64,
    pub adapter: &'a str,
    pub adapter_version: &'a str,
    pub adapter_epoch: u64,
    pub options: &'a O,
}

/// SHA-256 over the canonical JSON of a [`FingerprintInput`], hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint a request. Object keys are sorted before hashing, so key
    /// order in the options never changes the result.
    pub fn compute<O: Serialize>(input: &FingerprintInput<'_, O>) -> Result<Self, serde_json::Error> {
        let canonical = to_canonical_string(input)?;
        let digest = Sha256::digest(canonical.as_bytes());
        Ok(Self(hex::encode(digest)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

/// Finished artifacts by fingerprint.
///
/// Each fingerprint is written once; a second insert under the same key keeps
/// the first artifact. Reloads change the fingerprint through epochs, so stale
/// entries become unreachable rather than being evicted.
#[derive(Debug, Default)]
pub struct GenerationCache {
    entries: RwLock<HashMap<Fingerprint, Arc<GeneratedArtifact>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl GenerationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an artifact, counting the hit or miss.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Arc<GeneratedArtifact>> {
        let found = self.entries.read().get(fingerprint).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    /// Store an artifact, returning whichever artifact the cache now holds.
    pub fn insert(&self, fingerprint: Fingerprint, artifact: GeneratedArtifact) -> Arc<GeneratedArtifact> {
        Arc::clone(
            self.entries
                .write()
                .entry(fingerprint)
                .or_insert_with(|| Arc::new(artifact)),
        )
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.entries.read().contains_key(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}
