use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;

/// Fixed-length hex digest of a source's raw text, used to decide whether
/// re-indexing is required.
pub fn content_digest(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("could not encode hash registry: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("could not write hash registry `{path}`: {source}")]
    Write { path: PathBuf, source: std::io::Error },
}

/// Source → last-indexed digest map. Backed by a JSON file when a path is
/// configured; a missing or corrupt file starts the registry empty rather
/// than failing the load pass.
#[derive(Debug, Default)]
pub struct HashRegistry {
    path: Option<PathBuf>,
    entries: BTreeMap<String, String>,
}

impl HashRegistry {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
                Ok(entries) => entries,
                Err(error) => {
                    warn!(path = %path.display(), %error, "hash registry is corrupt, starting empty");
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };

        Self { path: Some(path), entries }
    }

    /// True iff the source has never been indexed or its content changed.
    pub fn should_reindex(&self, source: &str, digest: &str) -> bool {
        self.entries.get(source).map(|known| known != digest).unwrap_or(true)
    }

    pub fn record(&mut self, source: impl Into<String>, digest: impl Into<String>) {
        self.entries.insert(source.into(), digest.into());
    }

    pub fn remove(&mut self, source: &str) {
        self.entries.remove(source);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrites the backing file. A purely in-memory registry is a no-op.
    pub fn persist(&self) -> Result<(), RegistryError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let encoded = serde_json::to_string_pretty(&self.entries)?;
        fs::write(path, encoded)
            .map_err(|source| RegistryError::Write { path: path.clone(), source })
    }
}
