//! Attribute resolution: entity field values → ReDIF attribute/value pairs.
//!
//! The transformation is chosen by the RePEc attribute key, not by the field
//! type. Referenced users, terms and files are loaded through the
//! [`ReferenceLoader`]; a failed load degrades the field to "no results" and is
//! reported as a warning.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use tracing::{debug, warn};

use crate::bundle::BundleMapping;
use crate::contract::{ContentEntity, EntityId, FieldItem, ReferenceLoader};
use crate::error::{LoadError, Outcome, RepecError};
use crate::settings::ArchiveSettings;
use crate::template::AttributePair;

const DATE_FORMAT: &str = "%Y-%m-%d";

fn markup_pattern() -> &'static Regex {
    static P: OnceLock<Regex> = OnceLock::new();
    P.get_or_init(|| Regex::new(r"(?s)<!--.*?-->|<[^>]*>").expect("markup pattern is valid"))
}

/// Removes markup tags and comments.
pub fn strip_tags(text: &str) -> String {
    markup_pattern().replace_all(text, "").into_owned()
}

/// Abstracts are written on a single ReDIF line: no tags, no CR/LF.
pub fn clean_abstract(text: &str) -> String {
    strip_tags(text).replace(['\r', '\n'], "")
}

/// `application/pdf` → `Application/Pdf`.
pub fn file_format(mime_type: &str) -> String {
    mime_type
        .split('/')
        .map(capitalize_first)
        .collect::<Vec<_>>()
        .join("/")
}

fn capitalize_first(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Formats a Unix timestamp (or an ISO-8601 date/datetime) as `YYYY-MM-DD`, UTC.
pub fn format_creation_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0).map(|d| d.format(DATE_FORMAT).to_string());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc().format(DATE_FORMAT).to_string());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.format(DATE_FORMAT).to_string());
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .map(|d| d.format(DATE_FORMAT).to_string())
}

fn first_value(items: &[FieldItem]) -> &str {
    items
        .first()
        .and_then(|item| item.value.as_deref())
        .unwrap_or("")
}

// Reference fields count as empty unless their first item carries a target.
fn target_ids(items: &[FieldItem]) -> Vec<EntityId> {
    match items.first().and_then(|item| item.target_id) {
        Some(_) => items.iter().filter_map(|item| item.target_id).collect(),
        None => Vec::new(),
    }
}

fn field_items<'e>(
    entity: &'e dyn ContentEntity,
    mapping: &BundleMapping,
    attribute_key: &str,
) -> &'e [FieldItem] {
    match mapping.field_for(attribute_key) {
        Some(field_name) if !field_name.is_empty() && entity.has_field(field_name) => {
            entity.field_values(field_name)
        }
        _ => &[],
    }
}

/// Resolves attribute keys of one entity against its bundle mapping.
pub struct AttributeResolver<'a, L: ?Sized> {
    loader: &'a L,
    settings: &'a ArchiveSettings,
}

impl<'a, L: ReferenceLoader + ?Sized> AttributeResolver<'a, L> {
    pub fn new(loader: &'a L, settings: &'a ArchiveSettings) -> Self {
        Self { loader, settings }
    }

    pub fn resolve(
        &self,
        entity: &dyn ContentEntity,
        mapping: &BundleMapping,
        attribute_key: &str,
        attribute_label: &str,
    ) -> Outcome<Vec<AttributePair>> {
        let items = field_items(entity, mapping, attribute_key);
        debug!(
            entity_id = entity.id(),
            attribute_key,
            items = items.len(),
            "Resolving attribute"
        );

        match attribute_key {
            "file_url" => self.file_attributes(items),
            "author_name" => self.author_attributes(items, attribute_label),
            "abstract" => Outcome::new(vec![AttributePair::new(
                attribute_label,
                clean_abstract(first_value(items)),
            )]),
            "keywords" => self
                .keywords_value(items)
                .map(|value| vec![AttributePair::new(attribute_label, value)]),
            "creation_date" => {
                let raw = first_value(items);
                if raw.is_empty() {
                    return Outcome::new(vec![AttributePair::new(attribute_label, "")]);
                }
                match format_creation_date(raw) {
                    Some(date) => Outcome::new(vec![AttributePair::new(attribute_label, date)]),
                    None => {
                        warn!(entity_id = entity.id(), value = raw, "Creation date is not a date");
                        Outcome::with_warning(
                            vec![AttributePair::new(attribute_label, "")],
                            RepecError::InvalidDate {
                                field: attribute_key.to_string(),
                                value: raw.to_string(),
                            },
                        )
                    }
                }
            }
            _ => Outcome::new(vec![AttributePair::new(attribute_label, first_value(items))]),
        }
    }

    fn reference_failure(field: &str, source: LoadError) -> RepecError {
        warn!(field, error = %source, "Referenced entities could not be loaded");
        RepecError::Reference {
            field: field.to_string(),
            source,
        }
    }

    /// One `File-URL` / `File-Format` couple per referenced file.
    fn file_attributes(&self, items: &[FieldItem]) -> Outcome<Vec<AttributePair>> {
        let ids: Vec<EntityId> = items.iter().filter_map(|item| item.target_id).collect();
        if ids.is_empty() {
            return Outcome::new(Vec::new());
        }
        match self.loader.load_files(&ids) {
            Ok(files) => Outcome::new(
                files
                    .iter()
                    .flat_map(|file| {
                        let url = self.settings.public_url(&file.uri).replace(' ', "%20");
                        [
                            AttributePair::new("File-URL", url),
                            AttributePair::new("File-Format", file_format(&file.mime_type)),
                        ]
                    })
                    .collect(),
            ),
            Err(e) => Outcome::with_warning(Vec::new(), Self::reference_failure("file_url", e)),
        }
    }

    fn author_attributes(&self, items: &[FieldItem], label: &str) -> Outcome<Vec<AttributePair>> {
        let ids = target_ids(items);
        if ids.is_empty() {
            return Outcome::new(Vec::new());
        }
        match self.loader.load_users(&ids) {
            Ok(users) => Outcome::new(
                users
                    .into_iter()
                    .map(|user| AttributePair::new(label, user.name))
                    .collect(),
            ),
            Err(e) => Outcome::with_warning(Vec::new(), Self::reference_failure("author_name", e)),
        }
    }

    fn keywords_value(&self, items: &[FieldItem]) -> Outcome<String> {
        let ids = target_ids(items);
        if ids.is_empty() {
            return Outcome::new(String::new());
        }
        match self.loader.load_terms(&ids) {
            Ok(terms) => Outcome::new(
                terms
                    .iter()
                    .map(|term| term.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            Err(e) => Outcome::with_warning(String::new(), Self::reference_failure("keywords", e)),
        }
    }
}
