//! Theme token lookup.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

/// Errors that can occur while reading theme data.
#[derive(Debug, thiserror::Error)]
pub enum ThemeError {
    #[error("Theme not found: {0}")]
    NotFound(String),

    #[error("Failed to read theme {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse theme {path}: {message}")]
    Parse { path: String, message: String },
}

/// Supplies design tokens for a component. Token contents are opaque.
pub trait ThemeProvider: Send + Sync {
    /// Tokens for `component` in `theme`, or `None` if the theme has none.
    fn tokens(&self, theme: &str, component: &str) -> Result<Option<Value>, ThemeError>;
}

/// Reads `<dir>/<theme>.json` documents of the form
/// `{ "components": { "Button": { ... } } }`.
#[derive(Debug)]
pub struct JsonThemeProvider {
    dir: PathBuf,
    themes: RwLock<HashMap<String, Arc<Value>>>,
}

impl JsonThemeProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            themes: RwLock::new(HashMap::new()),
        }
    }

    fn load(&self, theme: &str) -> Result<Arc<Value>, ThemeError> {
        if let Some(doc) = self.themes.read().get(theme) {
            return Ok(Arc::clone(doc));
        }

        let path = self.dir.join(format!("{theme}.json"));
        if !path.is_file() {
            return Err(ThemeError::NotFound(path.display().to_string()));
        }

        let source = fs::read_to_string(&path).map_err(|e| ThemeError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let doc: Value = serde_json::from_str(&source).map_err(|e| ThemeError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let doc = Arc::new(doc);
        self.themes.write().insert(theme.to_string(), Arc::clone(&doc));
        Ok(doc)
    }
}

impl ThemeProvider for JsonThemeProvider {
    fn tokens(&self, theme: &str, component: &str) -> Result<Option<Value>, ThemeError> {
        let doc = self.load(theme)?;
        Ok(doc.get("components").and_then(|c| c.get(component)).cloned())
    }
}
