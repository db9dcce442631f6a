//! Per-bundle field mapping settings and the gateway reading/writing them.
//!
//! Settings are stored per `(entity type, bundle)` under
//! `repec_bundle.<entity_type>.<bundle>` as a JSON object that only holds the
//! keys differing from [`BundleMapping::default`]. Reads always overlay the
//! stored object on the defaults, so every known key resolves.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::contract::ConfigStore;
use crate::error::RepecError;
use crate::series::SeriesType;

/// Every setting key a bundle mapping knows about.
pub const AVAILABLE_SETTINGS: [&str; 13] = [
    "enabled",
    "serie_type",
    "serie_name",
    "is_different_serie_directory",
    "serie_directory",
    "restriction_by_field",
    "restriction_field",
    "author_name",
    "abstract",
    "creation_date",
    "file_url",
    "keywords",
    "provider_name",
];

/// Field-mapping configuration of one entity bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleMapping {
    pub enabled: bool,
    #[serde(deserialize_with = "empty_as_none")]
    pub serie_type: Option<SeriesType>,
    pub serie_name: String,
    pub is_different_serie_directory: bool,
    pub serie_directory: String,
    pub restriction_by_field: bool,
    pub restriction_field: String,
    pub author_name: String,
    #[serde(rename = "abstract")]
    pub abstract_field: String,
    pub creation_date: String,
    pub file_url: String,
    pub keywords: String,
    pub provider_name: String,
}

impl Default for BundleMapping {
    fn default() -> Self {
        Self {
            enabled: false,
            serie_type: None,
            serie_name: String::new(),
            is_different_serie_directory: true,
            serie_directory: String::new(),
            restriction_by_field: false,
            restriction_field: String::new(),
            author_name: String::new(),
            abstract_field: String::new(),
            creation_date: String::new(),
            file_url: String::new(),
            keywords: String::new(),
            provider_name: String::new(),
        }
    }
}

impl BundleMapping {
    /// Entity field mapped to a RePEc attribute key. `None` for keys that are not field mappings.
    pub fn field_for(&self, attribute_key: &str) -> Option<&str> {
        let field = match attribute_key {
            "author_name" => &self.author_name,
            "abstract" => &self.abstract_field,
            "creation_date" => &self.creation_date,
            "file_url" => &self.file_url,
            "keywords" => &self.keywords,
            "provider_name" => &self.provider_name,
            _ => return None,
        };
        Some(field.as_str())
    }
}

// Unset series types are stored as an empty string by form-based editors.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<SeriesType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(code) => SeriesType::from_code(code)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown series type {code:?}"))),
    }
}

fn unset_as_null(setting: &str, value: &Value) -> Value {
    match value {
        Value::String(code) if setting == "serie_type" && code.is_empty() => Value::Null,
        other => other.clone(),
    }
}

/// Gateway to the bundle settings held in a [`ConfigStore`].
pub struct BundleSettings<S> {
    store: S,
}

impl<S: ConfigStore> BundleSettings<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn storage_key(entity_type_id: &str, bundle: &str) -> String {
        format!("repec_bundle.{entity_type_id}.{bundle}")
    }

    /// The default value of every known setting.
    pub fn defaults() -> Map<String, Value> {
        match serde_json::to_value(BundleMapping::default()) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Stored settings merged over the defaults.
    pub fn get_all(&self, entity_type_id: &str, bundle: &str) -> Result<Map<String, Value>, RepecError> {
        let key = Self::storage_key(entity_type_id, bundle);
        let stored = self
            .store
            .get(&key)
            .map_err(|source| RepecError::Store {
                key: key.clone(),
                source,
            })?;

        let mut merged = Self::defaults();
        if let Some(stored) = stored {
            let overrides: Map<String, Value> = serde_json::from_value(stored)
                .map_err(|source| RepecError::InvalidBundleSettings {
                    key: key.clone(),
                    source,
                })?;
            debug!(key = %key, overrides = overrides.len(), "Merging stored bundle settings over defaults");
            merged.extend(overrides);
        }
        Ok(merged)
    }

    /// A single setting. `None` only for keys that are not bundle settings.
    pub fn get(
        &self,
        setting: &str,
        entity_type_id: &str,
        bundle: &str,
    ) -> Result<Option<Value>, RepecError> {
        let mut all = self.get_all(entity_type_id, bundle)?;
        Ok(all.remove(setting))
    }

    /// The typed, merged mapping of a bundle.
    pub fn mapping(&self, entity_type_id: &str, bundle: &str) -> Result<BundleMapping, RepecError> {
        let merged = self.get_all(entity_type_id, bundle)?;
        serde_json::from_value(Value::Object(merged)).map_err(|source| {
            RepecError::InvalidBundleSettings {
                key: Self::storage_key(entity_type_id, bundle),
                source,
            }
        })
    }

    /// Stores `settings`, leaving out every key whose value equals its default.
    pub fn set(
        &self,
        settings: &Map<String, Value>,
        entity_type_id: &str,
        bundle: &str,
    ) -> Result<(), RepecError> {
        let key = Self::storage_key(entity_type_id, bundle);
        let defaults = Self::defaults();
        let compacted: Map<String, Value> = settings
            .iter()
            .map(|(setting, value)| (setting, unset_as_null(setting, value)))
            .filter(|(setting, value)| defaults.get(setting.as_str()) != Some(value))
            .map(|(setting, value)| (setting.clone(), value))
            .collect();

        info!(
            key = %key,
            given = settings.len(),
            stored = compacted.len(),
            "Storing bundle settings"
        );
        self.store
            .set(&key, Value::Object(compacted))
            .map_err(|source| RepecError::Store { key, source })
    }

    pub fn set_mapping(
        &self,
        mapping: &BundleMapping,
        entity_type_id: &str,
        bundle: &str,
    ) -> Result<(), RepecError> {
        let settings = match serde_json::to_value(mapping) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(source) => {
                return Err(RepecError::InvalidBundleSettings {
                    key: Self::storage_key(entity_type_id, bundle),
                    source,
                })
            }
        };
        self.set(&settings, entity_type_id, bundle)
    }
}
