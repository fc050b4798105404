use std::cell::RefCell;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::kernel::error::Result;
use crate::storage::error::StorageSystemError;
use crate::storage::provider::StorageProvider;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    /// Every format compiled in, in lookup order.
    pub fn all() -> &'static [ConfigFormat] {
        &[
            ConfigFormat::Json,
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml,
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml,
        ]
    }

    /// Every extension recognised for this format, preferred first.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            ConfigFormat::Json => &["json"],
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => &["yaml", "yml"],
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => &["toml"],
        }
    }

    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "yaml",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }
}

/// Plugin configuration with dot-notation access (`database.migrations`).
#[derive(Debug, Default)]
pub struct ConfigRepository {
    items: RefCell<Map<String, Value>>,
}

impl ConfigRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> Self {
        let items = match value {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                log::warn!("Configuration root is not a table, ignoring: {}", other);
                Map::new()
            }
        };
        Self {
            items: RefCell::new(items),
        }
    }

    /// Parse configuration text in the given format.
    pub fn parse(data: &str, format: ConfigFormat) -> Result<Self> {
        let deserialize_error = |format: &str, e: Box<dyn std::error::Error + Send + Sync>| {
            StorageSystemError::DeserializationError {
                format: format.to_string(),
                source: e,
            }
        };
        let value: Value = match format {
            ConfigFormat::Json => {
                serde_json::from_str(data).map_err(|e| deserialize_error("json", Box::new(e)))?
            }
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => {
                serde_yaml::from_str(data).map_err(|e| deserialize_error("yaml", Box::new(e)))?
            }
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => {
                toml::from_str(data).map_err(|e| deserialize_error("toml", Box::new(e)))?
            }
        };
        Ok(Self::from_value(value))
    }

    /// Read and parse a config file, picking the format from its extension.
    pub fn from_file(files: &dyn StorageProvider, path: &Path) -> Result<Self> {
        let format = ConfigFormat::from_path(path).ok_or_else(|| {
            StorageSystemError::UnsupportedConfigFormat(path.display().to_string())
        })?;
        let content = files.read_to_string(path)?;
        Self::parse(&content, format)
    }

    /// Look up a dotted key and deserialize it.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_value(key)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn get_value(&self, key: &str) -> Option<Value> {
        let items = self.items.borrow();
        let mut segments = key.split('.');
        let first = segments.next()?;
        let mut current = items.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current.clone())
    }

    pub fn has(&self, key: &str) -> bool {
        self.get_value(key).is_some()
    }

    /// Set a dotted key, creating intermediate tables.
    pub fn set<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(|e| StorageSystemError::SerializationError {
            format: "json".to_string(),
            source: Box::new(e),
        })?;

        let segments: Vec<&str> = key.split('.').collect();
        insert_dotted(&mut self.items.borrow_mut(), &segments, value);
        Ok(())
    }

    pub fn all(&self) -> Value {
        Value::Object(self.items.borrow().clone())
    }
}

/// Insert `value` under `segments`, replacing scalars in the way with tables.
fn insert_dotted(table: &mut Map<String, Value>, segments: &[&str], value: Value) {
    match segments {
        [] => {}
        [last] => {
            table.insert(last.to_string(), value);
        }
        [first, rest @ ..] => {
            let entry = table
                .entry(first.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            match entry {
                Value::Object(child) => insert_dotted(child, rest, value),
                scalar => {
                    let mut child = Map::new();
                    insert_dotted(&mut child, rest, value);
                    *scalar = Value::Object(child);
                }
            }
        }
    }
}
