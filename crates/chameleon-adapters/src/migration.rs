//! Feature coverage between two adapters.

use std::collections::BTreeSet;

use serde::Serialize;

/// Coverage needed for a migration to be considered possible.
pub const MIGRATION_THRESHOLD: f64 = 80.0;

/// How much of one adapter's feature set another adapter covers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub from: String,
    pub to: String,
    pub possible: bool,
    pub coverage_percentage: f64,
    pub common_features: Vec<String>,
    pub missing_features: Vec<String>,
}

impl MigrationReport {
    /// Compare the features of `from` against those of `to`.
    ///
    /// An empty source feature set is fully covered.
    pub fn between(
        from: &str,
        from_features: &BTreeSet<String>,
        to: &str,
        to_features: &BTreeSet<String>,
    ) -> Self {
        let common_features: Vec<String> = from_features.intersection(to_features).cloned().collect();
        let missing_features: Vec<String> = from_features.difference(to_features).cloned().collect();

        let coverage_percentage = if from_features.is_empty() {
            100.0
        } else {
            common_features.len() as f64 / from_features.len() as f64 * 100.0
        };

        Self {
            from: from.to_string(),
            to: to.to_string(),
            possible: coverage_percentage >= MIGRATION_THRESHOLD,
            coverage_percentage,
            common_features,
            missing_features,
        }
    }
}
