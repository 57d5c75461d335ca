//! Persisted per-source visibility.
//!
//! The enabled-set is the only state that outlives a session. It is stored as
//! a single JSON object `{source: bool}` under [`ENABLED_SOURCES_KEY`].

use crate::shared::error::ScannerError;
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Storage key for the enabled-source mapping
pub const ENABLED_SOURCES_KEY: &str = "arb_scanner_enabled_sources";

/// Durable client-side key-value storage
pub trait PreferenceStore: Send {
    fn load(&self, key: &str) -> Result<Option<String>, ScannerError>;
    fn save(&mut self, key: &str, value: &str) -> Result<(), ScannerError>;
}

/// One `<key>.json` file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl PreferenceStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>, ScannerError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), ScannerError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

/// In-process store; clones share the same entries
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }
}

impl PreferenceStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, ScannerError> {
        Ok(self.get(key))
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), ScannerError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ScannerError::Preferences("memory store poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// `source -> enabled`, defaulting to enabled for anything not recorded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnabledSourceSet {
    states: IndexMap<String, bool>,
}

impl EnabledSourceSet {
    /// Every listed source enabled
    pub fn with_defaults<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            states: sources.into_iter().map(|s| (s.into(), true)).collect(),
        }
    }

    /// Defaults merged with whatever the store holds. Stored values win for
    /// known sources, unknown stored keys are kept, and anything unreadable
    /// falls back entirely to the defaults.
    pub fn load<I, S>(store: &dyn PreferenceStore, defaults: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::with_defaults(defaults);

        let raw = match store.load(ENABLED_SOURCES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return set,
            Err(e) => {
                warn!(error = %e, "Failed to read enabled sources, using defaults");
                return set;
            }
        };

        match serde_json::from_str::<BTreeMap<String, bool>>(&raw) {
            Ok(stored) => {
                debug!(stored = stored.len(), "Loaded enabled sources");
                for (source, enabled) in stored {
                    set.states.insert(source, enabled);
                }
            }
            Err(e) => warn!(error = %e, "Stored enabled sources are malformed, using defaults"),
        }

        set
    }

    /// Write the full mapping to `store`
    pub fn save(&self, store: &mut dyn PreferenceStore) -> Result<(), ScannerError> {
        store.save(ENABLED_SOURCES_KEY, &self.to_json()?)
    }

    pub fn to_json(&self) -> Result<String, ScannerError> {
        let ordered: BTreeMap<&str, bool> = self
            .states
            .iter()
            .map(|(source, enabled)| (source.as_str(), *enabled))
            .collect();
        Ok(serde_json::to_string(&ordered)?)
    }

    pub fn is_enabled(&self, source: &str) -> bool {
        self.states.get(source).copied().unwrap_or(true)
    }

    /// Flip `source`, returning the new state
    pub fn toggle(&mut self, source: &str) -> bool {
        let enabled = !self.is_enabled(source);
        self.states.insert(source.to_string(), enabled);
        enabled
    }

    pub fn set(&mut self, source: &str, enabled: bool) {
        self.states.insert(source.to_string(), enabled);
    }

    /// Record a newly seen source with the default (enabled) state
    pub fn ensure(&mut self, source: &str) {
        if !self.states.contains_key(source) {
            self.states.insert(source.to_string(), true);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.states.iter().map(|(s, e)| (s.as_str(), *e))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
