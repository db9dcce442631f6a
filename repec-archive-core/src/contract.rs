//! # contract: interfaces to the content and configuration collaborators
//!
//! The engine never talks to a content storage or configuration backend
//! directly. It reads entities through [`ContentEntity`], loads referenced
//! users, taxonomy terms and files through [`ReferenceLoader`], and reads/writes
//! per-bundle settings through [`ConfigStore`].
//!
//! ## Mocking & Testing
//! - [`ReferenceLoader`] and [`ConfigStore`] are annotated for `mockall`, the
//!   generated mocks are exported with the `test-export-mocks` feature.
//! - [`EntityRecord`] is a plain owned entity, handy for tests and for content
//!   dumps read from disk.
//!
//! ## Adding New Collaborators
//! - Implement the trait for your backend.
//! - Convert backend failures into [`LoadError`] / [`StoreError`]; the engine turns
//!   them into warnings and keeps going.

use std::collections::BTreeMap;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{LoadError, StoreError};

/// Identifier of a content entity, user, term or file.
pub type EntityId = u64;

/// One item of a multi-valued entity field.
///
/// Plain fields carry `value`, reference fields carry `target_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldItem {
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub value: Option<String>,
    #[serde(default)]
    pub target_id: Option<EntityId>,
}

impl FieldItem {
    pub fn value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            target_id: None,
        }
    }

    pub fn target(target_id: EntityId) -> Self {
        Self {
            value: None,
            target_id: Some(target_id),
        }
    }
}

// Content dumps carry timestamps and flags as bare YAML/JSON scalars.
fn scalar_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Bool(b)) => Some(if b { "1" } else { "0" }.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

/// Read access to a content entity.
pub trait ContentEntity {
    fn entity_type_id(&self) -> &str;
    fn bundle(&self) -> &str;
    fn id(&self) -> EntityId;
    /// Human-readable title of the entity.
    fn label(&self) -> &str;
    fn has_field(&self, field_name: &str) -> bool;
    /// Items of a field, empty when the field is absent.
    fn field_values(&self, field_name: &str) -> &[FieldItem];
}

/// Owned content entity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityRecord {
    pub entity_type: String,
    pub bundle: String,
    pub id: EntityId,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub fields: BTreeMap<String, Vec<FieldItem>>,
}

impl EntityRecord {
    pub fn new(entity_type: &str, bundle: &str, id: EntityId, label: &str) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            bundle: bundle.to_string(),
            id,
            label: label.to_string(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, field_name: &str, items: Vec<FieldItem>) -> Self {
        self.fields.insert(field_name.to_string(), items);
        self
    }
}

impl ContentEntity for EntityRecord {
    fn entity_type_id(&self) -> &str {
        &self.entity_type
    }

    fn bundle(&self) -> &str {
        &self.bundle
    }

    fn id(&self) -> EntityId {
        self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn has_field(&self, field_name: &str) -> bool {
        self.fields.contains_key(field_name)
    }

    fn field_values(&self, field_name: &str) -> &[FieldItem] {
        self.fields
            .get(field_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// A user account referenced as author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: EntityId,
    /// Display name used for `Author-Name`.
    pub name: String,
}

/// A taxonomy term referenced as keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermRecord {
    pub id: EntityId,
    pub name: String,
}

/// A managed file referenced by an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: EntityId,
    /// Stream URI, e.g. `public://papers/wp 12.pdf`, or an absolute URL.
    pub uri: String,
    pub mime_type: String,
}

/// Bulk loading of entities referenced from entity fields.
///
/// Implementations return records in the order of `ids`. A stale id should be
/// reported as [`LoadError::Missing`].
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait ReferenceLoader {
    fn load_users(&self, ids: &[EntityId]) -> Result<Vec<UserRecord>, LoadError>;

    fn load_terms(&self, ids: &[EntityId]) -> Result<Vec<TermRecord>, LoadError>;

    fn load_files(&self, ids: &[EntityId]) -> Result<Vec<FileRecord>, LoadError>;
}

/// String-keyed configuration storage holding JSON values.
///
/// Writes go through `&self`; implementations use interior mutability.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait ConfigStore {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError>;

    fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError>;
}
