//! ReDIF templates: ordered attribute/value pairs and their text form.

use serde::{Deserialize, Serialize};

/// One `Attribute: Value` line of a ReDIF record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributePair {
    pub attribute: String,
    pub value: String,
}

impl AttributePair {
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }
}

/// What a template describes, which also decides the archive file it lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemplateKind {
    Archive,
    Series,
    Entity,
}

impl TemplateKind {
    /// Suffix appended to the archive code for the shared archive files.
    pub fn file_suffix(&self) -> Option<&'static str> {
        match self {
            TemplateKind::Archive => Some("archi"),
            TemplateKind::Series => Some("seri"),
            TemplateKind::Entity => None,
        }
    }
}

/// An ordered ReDIF record. Pair order is preserved as built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    kind: TemplateKind,
    pairs: Vec<AttributePair>,
}

impl Template {
    pub fn new(kind: TemplateKind) -> Self {
        Self {
            kind,
            pairs: Vec::new(),
        }
    }

    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    pub fn push(&mut self, attribute: impl Into<String>, value: impl Into<String>) {
        self.pairs.push(AttributePair::new(attribute, value));
    }

    pub fn pairs(&self) -> &[AttributePair] {
        &self.pairs
    }

    /// Mutable access for alteration hooks: append, remove or rewrite pairs.
    pub fn pairs_mut(&mut self) -> &mut Vec<AttributePair> {
        &mut self.pairs
    }

    /// First value recorded for `attribute`.
    pub fn value_of(&self, attribute: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|p| p.attribute == attribute)
            .map(|p| p.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Renders the record as ReDIF text, one `Attribute: Value` line per pair.
    ///
    /// Values are written verbatim; a value containing a line break corrupts
    /// the record, so callers sanitize beforehand.
    pub fn to_redif(&self) -> String {
        self.pairs
            .iter()
            .map(|p| format!("{}: {}\n", p.attribute, p.value))
            .collect()
    }
}

impl Extend<AttributePair> for Template {
    fn extend<I: IntoIterator<Item = AttributePair>>(&mut self, iter: I) {
        self.pairs.extend(iter);
    }
}
