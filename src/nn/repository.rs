use crate::nn::{FfbpDefinition, NetworkDefinition};
use crate::types::{AcError, AcResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Locates network definitions by their resource path
/// ("<sensor>/<training-set>/<topology>.net").
///
/// Definitions registered in memory take precedence over files below the
/// root directory.
#[derive(Debug, Default)]
pub struct NetworkRepository {
    root: Option<PathBuf>,
    embedded: HashMap<String, String>,
}

impl NetworkRepository {
    /// Repository reading definitions below `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: Some(root.as_ref().to_path_buf()),
            embedded: HashMap::new(),
        }
    }

    /// Repository holding only in-memory definitions
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Register a definition text under a resource path
    pub fn register(&mut self, resource_path: &str, text: impl Into<String>) {
        self.embedded.insert(normalize(resource_path), text.into());
    }

    pub fn contains(&self, resource_path: &str) -> bool {
        let key = normalize(resource_path);
        self.embedded.contains_key(&key) || self.file_path(&key).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Load and parse a definition. A missing or unreadable resource is fatal.
    pub fn load(&self, resource_path: &str) -> AcResult<Arc<dyn NetworkDefinition>> {
        let key = normalize(resource_path);

        let text = if let Some(text) = self.embedded.get(&key) {
            text.clone()
        } else {
            let path = self
                .file_path(&key)
                .ok_or_else(|| AcError::ResourceLoad(format!("resource not found: {}", key)))?;
            if !path.is_file() {
                return Err(AcError::ResourceLoad(format!("resource not found: {}", path.display())));
            }
            std::fs::read_to_string(&path)
                .map_err(|e| AcError::ResourceLoad(format!("unable to read {}: {}", path.display(), e)))?
        };

        let definition = FfbpDefinition::parse(&text)
            .map_err(|e| AcError::ResourceLoad(format!("unable to parse network {}: {}", key, e)))?;
        log::info!("Loaded neural network: {}", key);
        Ok(Arc::new(definition))
    }

    fn file_path(&self, key: &str) -> Option<PathBuf> {
        self.root.as_ref().map(|root| root.join(key))
    }
}

fn normalize(resource_path: &str) -> String {
    resource_path.trim_start_matches('/').to_string()
}
