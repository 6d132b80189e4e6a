//! Key-value storage backends
//!
//! LocalStorage in the browser, one JSON file per key on native.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::persistence::PersistenceError;

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError>;
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}

/// In-memory store (tests, or when nothing else is available)
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
mod web {
    use super::*;

    /// Browser LocalStorage
    pub struct LocalStore {
        storage: web_sys::Storage,
    }

    impl LocalStore {
        pub fn open() -> Result<Self, PersistenceError> {
            web_sys::window()
                .and_then(|w| w.local_storage().ok())
                .flatten()
                .map(|storage| Self { storage })
                .ok_or(PersistenceError::StorageUnavailable)
        }
    }

    impl KeyValueStore for LocalStore {
        fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
            self.storage
                .get_item(key)
                .map_err(|_| PersistenceError::StorageUnavailable)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
            self.storage
                .set_item(key, value)
                .map_err(|_| PersistenceError::StorageUnavailable)
        }

        fn remove(&self, key: &str) -> Result<(), PersistenceError> {
            self.storage
                .remove_item(key)
                .map_err(|_| PersistenceError::StorageUnavailable)
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::LocalStore;

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::path::PathBuf;

    use super::*;

    /// Environment variable naming the data directory
    pub const DATA_DIR_ENV: &str = "QUANTUM_GRID_DATA_DIR";

    /// One `<key>.json` file per key under a directory
    pub struct FileStore {
        dir: PathBuf,
    }

    impl FileStore {
        pub fn new(dir: impl Into<PathBuf>) -> Self {
            Self { dir: dir.into() }
        }

        /// Directory from `QUANTUM_GRID_DATA_DIR`, or the working directory
        pub fn from_env() -> Self {
            let dir = std::env::var_os(DATA_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            Self::new(dir)
        }

        fn path(&self, key: &str) -> PathBuf {
            self.dir.join(format!("{key}.json"))
        }
    }

    impl KeyValueStore for FileStore {
        fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
            match std::fs::read_to_string(self.path(key)) {
                Ok(text) => Ok(Some(text)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        }

        fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
            std::fs::create_dir_all(&self.dir)?;
            // Write then rename so a crash never leaves half a file
            let tmp = self.dir.join(format!("{key}.json.tmp"));
            std::fs::write(&tmp, value)?;
            std::fs::rename(&tmp, self.path(key))?;
            Ok(())
        }

        fn remove(&self, key: &str) -> Result<(), PersistenceError> {
            match std::fs::remove_file(self.path(key)) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native::{DATA_DIR_ENV, FileStore};

/// The platform's persistent store
#[cfg(target_arch = "wasm32")]
pub fn default_store() -> Box<dyn KeyValueStore> {
    match LocalStore::open() {
        Ok(store) => Box::new(store),
        Err(e) => {
            log::warn!("LocalStorage unavailable ({}), using memory store", e);
            Box::new(MemoryStore::new())
        }
    }
}

/// The platform's persistent store
#[cfg(not(target_arch = "wasm32"))]
pub fn default_store() -> Box<dyn KeyValueStore> {
    Box::new(FileStore::from_env())
}
