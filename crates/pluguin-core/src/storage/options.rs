use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::PathBuf;
use std::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::kernel::error::Result;
use crate::storage::error::StorageSystemError;
use crate::storage::provider::StorageProvider;

/// Named key-value records, the host's persisted state.
pub trait OptionStore: Debug {
    fn get_option(&self, name: &str) -> Result<Option<Value>>;

    /// Insert a record; returns `false` and leaves the store untouched if it already exists.
    fn add_option(&self, name: &str, value: Value) -> Result<bool>;

    /// Insert or replace a record.
    fn update_option(&self, name: &str, value: Value) -> Result<()>;

    /// Remove a record; returns whether it existed.
    fn delete_option(&self, name: &str) -> Result<bool>;
}

/// Typed access on top of any [`OptionStore`].
pub trait OptionStoreExt {
    fn get_typed<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>>;

    fn update_typed<T: Serialize>(&self, name: &str, value: &T) -> Result<()>;
}

impl<S: OptionStore + ?Sized> OptionStoreExt for S {
    fn get_typed<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match self.get_option(name)? {
            None => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| {
                    StorageSystemError::InvalidOption {
                        name: name.to_string(),
                        source,
                    }
                    .into()
                }),
        }
    }

    fn update_typed<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(|source| StorageSystemError::InvalidOption {
            name: name.to_string(),
            source,
        })?;
        self.update_option(name, value)
    }
}

/// In-memory option store.
#[derive(Debug, Default)]
pub struct MemoryOptionStore {
    options: RefCell<BTreeMap<String, Value>>,
}

impl MemoryOptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<String> {
        self.options.borrow().keys().cloned().collect()
    }
}

impl OptionStore for MemoryOptionStore {
    fn get_option(&self, name: &str) -> Result<Option<Value>> {
        Ok(self.options.borrow().get(name).cloned())
    }

    fn add_option(&self, name: &str, value: Value) -> Result<bool> {
        let mut options = self.options.borrow_mut();
        if options.contains_key(name) {
            return Ok(false);
        }
        options.insert(name.to_string(), value);
        Ok(true)
    }

    fn update_option(&self, name: &str, value: Value) -> Result<()> {
        self.options.borrow_mut().insert(name.to_string(), value);
        Ok(())
    }

    fn delete_option(&self, name: &str) -> Result<bool> {
        Ok(self.options.borrow_mut().remove(name).is_some())
    }
}

/// Option store persisted as a single JSON document.
///
/// The document is read on first access and rewritten after every change.
#[derive(Debug)]
pub struct FileOptionStore {
    provider: Rc<dyn StorageProvider>,
    path: PathBuf,
    cache: RefCell<Option<BTreeMap<String, Value>>>,
}

impl FileOptionStore {
    pub fn new(provider: Rc<dyn StorageProvider>, path: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            path: path.into(),
            cache: RefCell::new(None),
        }
    }

    fn load(&self) -> Result<BTreeMap<String, Value>> {
        if let Some(cached) = self.cache.borrow().as_ref() {
            return Ok(cached.clone());
        }
        let options = if self.provider.exists(&self.path) {
            let content = self.provider.read_to_string(&self.path)?;
            serde_json::from_str(&content).map_err(|e| StorageSystemError::DeserializationError {
                format: "json".to_string(),
                source: Box::new(e),
            })?
        } else {
            BTreeMap::new()
        };
        *self.cache.borrow_mut() = Some(options.clone());
        Ok(options)
    }

    fn persist(&self, options: BTreeMap<String, Value>) -> Result<()> {
        let content = serde_json::to_string_pretty(&options).map_err(|e| {
            StorageSystemError::SerializationError {
                format: "json".to_string(),
                source: Box::new(e),
            }
        })?;
        self.provider.write_string(&self.path, &content)?;
        *self.cache.borrow_mut() = Some(options);
        log::debug!("Persisted options to {}", self.path.display());
        Ok(())
    }
}

impl OptionStore for FileOptionStore {
    fn get_option(&self, name: &str) -> Result<Option<Value>> {
        Ok(self.load()?.get(name).cloned())
    }

    fn add_option(&self, name: &str, value: Value) -> Result<bool> {
        let mut options = self.load()?;
        if options.contains_key(name) {
            return Ok(false);
        }
        options.insert(name.to_string(), value);
        self.persist(options)?;
        Ok(true)
    }

    fn update_option(&self, name: &str, value: Value) -> Result<()> {
        let mut options = self.load()?;
        options.insert(name.to_string(), value);
        self.persist(options)
    }

    fn delete_option(&self, name: &str) -> Result<bool> {
        let mut options = self.load()?;
        if options.remove(name).is_none() {
            return Ok(false);
        }
        self.persist(options)?;
        Ok(true)
    }
}
