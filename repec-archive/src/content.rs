//! YAML content dump: the entities to publish and the users, terms and files they reference.
//!
//! ```yaml
//! users:
//!   - { id: 7, name: Jane Doe }
//! terms:
//!   - { id: 10, name: Macro }
//! files:
//!   - { id: 3, uri: "public://papers/wp 12.pdf", mime_type: application/pdf }
//! entities:
//!   - entity_type: node
//!     bundle: paper
//!     id: 42
//!     label: Growth and Trade
//!     fields:
//!       field_authors: [{ target_id: 7 }]
//!       created: [{ value: 1700000000 }]
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use repec_archive_core::contract::{
    EntityId, EntityRecord, FileRecord, ReferenceLoader, TermRecord, UserRecord,
};
use repec_archive_core::error::LoadError;
use serde::Deserialize;
use tracing::{debug, info};

/// Referenced records, indexed by id.
#[derive(Debug, Default)]
pub struct References {
    users: BTreeMap<EntityId, UserRecord>,
    terms: BTreeMap<EntityId, TermRecord>,
    files: BTreeMap<EntityId, FileRecord>,
}

/// Records are returned in the order of `ids`; an unknown id is a stale reference.
fn pick<T: Clone>(
    kind: &'static str,
    records: &BTreeMap<EntityId, T>,
    ids: &[EntityId],
) -> Result<Vec<T>, LoadError> {
    ids.iter()
        .map(|id| {
            records
                .get(id)
                .cloned()
                .ok_or(LoadError::Missing { kind, id: *id })
        })
        .collect()
}

impl ReferenceLoader for References {
    fn load_users(&self, ids: &[EntityId]) -> Result<Vec<UserRecord>, LoadError> {
        pick("user", &self.users, ids)
    }

    fn load_terms(&self, ids: &[EntityId]) -> Result<Vec<TermRecord>, LoadError> {
        pick("taxonomy term", &self.terms, ids)
    }

    fn load_files(&self, ids: &[EntityId]) -> Result<Vec<FileRecord>, LoadError> {
        pick("file", &self.files, ids)
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawDump {
    #[serde(default)]
    users: Vec<UserRecord>,
    #[serde(default)]
    terms: Vec<TermRecord>,
    #[serde(default)]
    files: Vec<FileRecord>,
    #[serde(default)]
    entities: Vec<EntityRecord>,
}

/// A loaded content dump, split into what the publisher resolves and what gets published.
#[derive(Debug, Default)]
pub struct ContentDump {
    pub references: References,
    pub entities: Vec<EntityRecord>,
}

impl ContentDump {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(content_path = ?path, "Loading content dump");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read content dump {path:?}"))?;
        Self::parse(&content).with_context(|| format!("Failed to parse content dump {path:?}"))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let raw: RawDump = serde_yaml::from_str(content)?;
        let dump = ContentDump {
            references: References {
                users: raw.users.into_iter().map(|u| (u.id, u)).collect(),
                terms: raw.terms.into_iter().map(|t| (t.id, t)).collect(),
                files: raw.files.into_iter().map(|f| (f.id, f)).collect(),
            },
            entities: raw.entities,
        };
        debug!(
            entities = dump.entities.len(),
            users = dump.references.users.len(),
            terms = dump.references.terms.len(),
            files = dump.references.files.len(),
            "Content dump parsed"
        );
        Ok(dump)
    }
}

/// Entities of `entity_type` (all when `None`), optionally narrowed to one id.
pub fn select<'a>(
    entities: &'a [EntityRecord],
    entity_type: Option<&'a str>,
    id: Option<EntityId>,
) -> impl Iterator<Item = &'a EntityRecord> + 'a {
    entities.iter().filter(move |entity| {
        entity_type.map_or(true, |t| entity.entity_type == t) && id.map_or(true, |i| entity.id == i)
    })
}
