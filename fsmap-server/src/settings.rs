//! Persisted user settings
//!
//! A flat key-value store behind [`SettingsStore`], with a typed
//! [`Settings`] wrapper for the handful of values the app remembers between
//! runs: the last server address, the marker style and the last version run.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

const KEY_SERVER_ADDRESS: &str = "server_address";
const KEY_MARKER_STYLE: &str = "marker_style";
const KEY_VERSION: &str = "version";

/// Number of selectable aircraft marker styles
pub const MARKER_STYLE_COUNT: usize = 4;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key-value persistence
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, SettingsError>;
    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError>;
}

/// In-process store, lost on exit
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON object on disk, rewritten on every `set`
///
/// A value is visible to `get` only once it has been written. Writers are
/// serialised by `write_lock`; `values` is never held across file I/O.
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open (or lazily create) the store at `path`
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let values = if path.exists() {
            let bytes = std::fs::read(&path)?;
            serde_json::from_slice(&bytes)?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            values: Mutex::new(values),
            write_lock: Mutex::new(()),
        })
    }

    /// `<config dir>/fsmap/settings.json`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("fsmap").join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        let _writer = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut next = self
            .values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        next.insert(key.to_string(), value.to_string());
        self.write_file(&next)?;

        *self.values.lock().unwrap_or_else(|e| e.into_inner()) = next;
        Ok(())
    }
}

impl JsonFileStore {
    /// Replace the file via a sibling temp file so a failed write leaves the
    /// previous contents intact
    fn write_file(&self, values: &BTreeMap<String, String>) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(values)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Typed access to the persisted settings
pub struct Settings {
    store: Box<dyn SettingsStore>,
}

impl Settings {
    pub fn new(store: impl SettingsStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// Settings that only live as long as the process
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    pub fn server_address(&self) -> Result<Option<String>, SettingsError> {
        self.store.get(KEY_SERVER_ADDRESS)
    }

    /// Remember `address`; empty values are not persisted
    pub fn set_server_address(&self, address: &str) -> Result<(), SettingsError> {
        let address = address.trim();
        if address.is_empty() {
            return Ok(());
        }
        self.store.set(KEY_SERVER_ADDRESS, address)
    }

    /// Current marker style index, always below [`MARKER_STYLE_COUNT`]
    pub fn marker_style(&self) -> Result<usize, SettingsError> {
        let style = self
            .store
            .get(KEY_MARKER_STYLE)?
            .and_then(|raw| raw.parse::<usize>().ok())
            .filter(|style| *style < MARKER_STYLE_COUNT)
            .unwrap_or(0);
        Ok(style)
    }

    /// Step to the next marker style, wrapping to the first
    pub fn cycle_marker_style(&self) -> Result<usize, SettingsError> {
        let next = (self.marker_style()? + 1) % MARKER_STYLE_COUNT;
        self.store.set(KEY_MARKER_STYLE, &next.to_string())?;
        Ok(next)
    }

    /// Record `current` as the last version run
    ///
    /// Returns true when it differs from the previously recorded version.
    pub fn acknowledge_version(&self, current: &str) -> Result<bool, SettingsError> {
        let previous = self.store.get(KEY_VERSION)?;
        if previous.as_deref() == Some(current) {
            return Ok(false);
        }
        self.store.set(KEY_VERSION, current)?;
        Ok(true)
    }
}
