//! The RePEc series types an entity bundle can be published as.
//!
//! Each variant knows its ReDIF template type, its default header, the
//! attribute keys it is built from and where its entity files live.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::archive::{ArchiveFile, ArchiveWriter};
use crate::bundle::BundleMapping;
use crate::contract::ContentEntity;
use crate::error::RepecError;
use crate::template::{Template, TemplateKind};

/// An attribute key participating in an entity template, with its ReDIF label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredField {
    pub key: &'static str,
    pub label: &'static str,
}

const fn field(key: &'static str, label: &'static str) -> RequiredField {
    RequiredField { key, label }
}

const DOCUMENT_FIELDS: [RequiredField; 5] = [
    field("author_name", "Author-Name"),
    field("abstract", "Abstract"),
    field("creation_date", "Creation-Date"),
    field("file_url", "File-URL"),
    field("keywords", "Keywords"),
];

const BOOK_FIELDS: [RequiredField; 6] = [
    field("author_name", "Author-Name"),
    field("provider_name", "Provider-Name"),
    field("abstract", "Abstract"),
    field("creation_date", "Creation-Date"),
    field("file_url", "File-URL"),
    field("keywords", "Keywords"),
];

/// Supported RePEc series types. Serialized as their series code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeriesType {
    #[serde(rename = "wpaper")]
    WorkingPaper,
    #[serde(rename = "journl")]
    JournalArticle,
    #[serde(rename = "bookss")]
    Book,
    #[serde(rename = "chaptr")]
    BookChapter,
    #[serde(rename = "sftwre")]
    SoftwareComponent,
}

impl SeriesType {
    pub const ALL: [SeriesType; 5] = [
        SeriesType::WorkingPaper,
        SeriesType::JournalArticle,
        SeriesType::Book,
        SeriesType::BookChapter,
        SeriesType::SoftwareComponent,
    ];

    /// Six-letter series code, used in handles and as default directory.
    pub fn code(&self) -> &'static str {
        match self {
            SeriesType::WorkingPaper => "wpaper",
            SeriesType::JournalArticle => "journl",
            SeriesType::Book => "bookss",
            SeriesType::BookChapter => "chaptr",
            SeriesType::SoftwareComponent => "sftwre",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    /// Value of the `Type` attribute of the series template.
    pub fn series_type(&self) -> &'static str {
        match self {
            SeriesType::WorkingPaper => "ReDIF-Paper",
            SeriesType::JournalArticle => "ReDIF-Article",
            SeriesType::Book => "ReDIF-Book",
            SeriesType::BookChapter => "ReDIF-Chapter",
            SeriesType::SoftwareComponent => "ReDIF-Software",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SeriesType::WorkingPaper => "Paper series",
            SeriesType::JournalArticle => "Journal article series",
            SeriesType::Book => "Book series",
            SeriesType::BookChapter => "Book chapter series",
            SeriesType::SoftwareComponent => "Software component series",
        }
    }

    // Software templates name the item instead of titling it.
    fn title_attribute(&self) -> &'static str {
        match self {
            SeriesType::SoftwareComponent => "Name",
            _ => "Title",
        }
    }

    /// Attribute keys an entity template is built from, in output order.
    pub fn required_fields(&self) -> &'static [RequiredField] {
        match self {
            SeriesType::Book => &BOOK_FIELDS,
            SeriesType::WorkingPaper
            | SeriesType::JournalArticle
            | SeriesType::BookChapter
            | SeriesType::SoftwareComponent => &DOCUMENT_FIELDS,
        }
    }

    /// Mandatory header of an entity template: template type, title and handle.
    pub fn default_template(&self, archive_code: &str, entity: &dyn ContentEntity) -> Template {
        let mut template = Template::new(TemplateKind::Entity);
        template.push("Template-Type", format!("{} 1.0", self.series_type()));
        template.push(self.title_attribute(), entity.label());
        template.push(
            "Handle",
            format!("RePEc:{}:{}:{}", archive_code, self.code(), entity.id()),
        );
        template
    }

    /// Subdirectory of the archive holding this bundle's entity files.
    ///
    /// A bundle with its own directory uses `serie_directory` (None when unset),
    /// otherwise the series code is used.
    pub fn directory(&self, mapping: &BundleMapping) -> Option<String> {
        if mapping.is_different_serie_directory {
            let dir = mapping.serie_directory.trim();
            (!dir.is_empty()).then(|| dir.to_string())
        } else {
            Some(self.code().to_string())
        }
    }

    /// Location of the entity's file. The directory has to be one plain name
    /// so the file stays inside the archive directory.
    pub fn entity_file(
        &self,
        mapping: &BundleMapping,
        entity: &dyn ContentEntity,
    ) -> Result<ArchiveFile, RepecError> {
        let directory = self
            .directory(mapping)
            .ok_or_else(|| RepecError::EmptyDirectory {
                entity_type: entity.entity_type_id().to_string(),
                bundle: entity.bundle().to_string(),
            })?;
        let mut components = Path::new(&directory).components();
        if !matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) {
            return Err(RepecError::InvalidDirectory {
                entity_type: entity.entity_type_id().to_string(),
                bundle: entity.bundle().to_string(),
                directory,
            });
        }
        Ok(ArchiveFile::Entity {
            directory,
            entity_type: entity.entity_type_id().to_string(),
            id: entity.id(),
        })
    }

    /// Persists a built entity template in this series' directory.
    pub fn create(
        &self,
        writer: &ArchiveWriter,
        template: &Template,
        mapping: &BundleMapping,
        entity: &dyn ContentEntity,
    ) -> Result<PathBuf, RepecError> {
        let file = self.entity_file(mapping, entity)?;
        writer.create(template, &file)
    }
}
