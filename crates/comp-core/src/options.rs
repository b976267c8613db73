//! Named option values persisted in a JSON file
//!
//! Stands in for the host's option table. Reads before the first write see an
//! empty store. Read-modify-write cycles hold an exclusive sidecar lock so two
//! jobs updating different keys do not lose each other's writes.

use std::collections::BTreeMap;
use std::time::Duration;

use comp_fs::{FileLock, NormalizedPath, io, lock::DEFAULT_POLL_INTERVAL};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{Error, Result};

/// Option holding the cached plugin records.
pub const PLUGINS_OPTION: &str = "composition_plugins";
/// Option holding the cached theme records.
pub const THEMES_OPTION: &str = "composition_themes";
/// Option holding the last-seen lock content-hash.
pub const LOCK_HASH_OPTION: &str = "composition_lock_hash";

const LOCK_WAIT: Duration = Duration::from_secs(5);

/// JSON-file key-value store.
#[derive(Debug, Clone)]
pub struct OptionStore {
    path: NormalizedPath,
}

impl OptionStore {
    pub fn new(path: NormalizedPath) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &NormalizedPath {
        &self.path
    }

    fn lock_path(&self) -> NormalizedPath {
        NormalizedPath::new(format!("{}.lock", self.path.as_str()))
    }

    fn load(&self) -> Result<BTreeMap<String, Value>> {
        match io::read_text_optional(&self.path)? {
            Some(content) if !content.trim().is_empty() => serde_json::from_str(&content)
                .map_err(|e| Error::parse(self.path.to_native(), &e)),
            _ => Ok(BTreeMap::new()),
        }
    }

    fn store(&self, values: &BTreeMap<String, Value>) -> Result<()> {
        let content = serde_json::to_string_pretty(values)?;
        io::write_atomic(&self.path, content.as_bytes()).map_err(|source| Error::WriteError {
            path: self.path.to_native(),
            source,
        })
    }

    fn update<F>(&self, apply: F) -> Result<bool>
    where
        F: FnOnce(&mut BTreeMap<String, Value>) -> bool,
    {
        let _lock = FileLock::acquire(&self.lock_path(), LOCK_WAIT, DEFAULT_POLL_INTERVAL)?;
        let mut values = self.load()?;
        if !apply(&mut values) {
            return Ok(false);
        }
        self.store(&values)?;
        Ok(true)
    }

    /// Read an option, `None` when it was never set.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.load()?.remove(key) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Read an option, falling back to `T::default()` when it was never set.
    pub fn get_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        Ok(self.get(key)?.unwrap_or_default())
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.update(|values| {
            values.insert(key.to_string(), value);
            true
        })?;
        Ok(())
    }

    /// Remove an option. Returns `false` when it was not set.
    pub fn delete(&self, key: &str) -> Result<bool> {
        self.update(|values| values.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn store(temp: &TempDir) -> OptionStore {
        OptionStore::new(NormalizedPath::new(temp.path().join(".composition/options.json")))
    }

    #[test]
    fn reads_before_first_write_are_empty() {
        let temp = TempDir::new().unwrap();
        let options = store(&temp);

        assert_eq!(options.get::<String>(LOCK_HASH_OPTION).unwrap(), None);
        let plugins: BTreeMap<String, String> = options.get_or_default(PLUGINS_OPTION).unwrap();
        assert!(plugins.is_empty());
        assert!(!options.path().exists());
    }

    #[test]
    fn set_get_delete() {
        let temp = TempDir::new().unwrap();
        let options = store(&temp);

        options.set(LOCK_HASH_OPTION, &"abc123").unwrap();
        options.set(THEMES_OPTION, &vec!["twentytwenty"]).unwrap();

        assert_eq!(
            options.get::<String>(LOCK_HASH_OPTION).unwrap().as_deref(),
            Some("abc123")
        );
        assert!(options.delete(LOCK_HASH_OPTION).unwrap());
        assert!(!options.delete(LOCK_HASH_OPTION).unwrap());
        assert_eq!(
            options.get::<Vec<String>>(THEMES_OPTION).unwrap(),
            Some(vec!["twentytwenty".to_string()])
        );
    }

    #[test]
    fn corrupt_store_reports_parse_error() {
        let temp = TempDir::new().unwrap();
        let options = store(&temp);
        std::fs::create_dir_all(temp.path().join(".composition")).unwrap();
        std::fs::write(options.path().to_native(), "{ not json").unwrap();

        assert!(matches!(
            options.get::<String>(LOCK_HASH_OPTION),
            Err(Error::ParseError { .. })
        ));
    }
}
