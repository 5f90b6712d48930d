//! File-backed key-value store: one JSON object of string values.
use choicetype_core::{KeyValueStore, KvError};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const LEDGER_FILE: &str = "ledger.json";

#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Store backed by `<dir>/ledger.json`. The file is created on first write.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(LEDGER_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, KvError> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    /// Write the whole map to a sibling temp file, then rename over the original.
    fn save(&self, values: &BTreeMap<String, String>) -> Result<(), KvError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(values)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    type Error = KvError;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.load()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        self.set_many(&[(key, value.to_string())])
    }

    fn set_many(&self, entries: &[(&str, String)]) -> Result<(), Self::Error> {
        let mut values = match self.load() {
            Err(KvError::Serialization(err)) => {
                warn!("replacing unreadable {}: {err}", self.path.display());
                BTreeMap::new()
            }
            other => other?,
        };
        for (key, value) in entries {
            values.insert((*key).to_string(), value.clone());
        }
        self.save(&values)?;
        debug!("wrote {} key(s) to {}", entries.len(), self.path.display());
        Ok(())
    }
}
