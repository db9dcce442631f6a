//! Archive directory management.
//!
//! [`ArchiveWriter`] is the only component touching files below the archive
//! directory `<public_dir>/<base_path>/<archive_code>/`:
//!
//! - `<code>archi.rdf`: the archive record, rewritten on initialization
//! - `<code>seri.rdf`: the series index, one appended record per series
//! - `<dir>/<dir>_<entity_type>_<id>.rdf`: one record per published entity
//! - `.htaccess`: lets the harvester list the directory and read `.rdf` as text
//!
//! Every operation reports failures to the caller instead of aborting, so a
//! failed series append never blocks the entity write that follows it.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, error, info, warn};

use crate::bundle::BundleMapping;
use crate::contract::{ContentEntity, EntityId};
use crate::error::{Outcome, RepecError};
use crate::series::SeriesType;
use crate::settings::ArchiveSettings;
use crate::template::{Template, TemplateKind};

pub const HTACCESS_FILE: &str = ".htaccess";

/// Directory index for the harvester, and plain-text delivery of every file.
pub const HTACCESS_CONTENT: &str = "Options +Indexes
# Unset Drupal_Security_Do_Not_Remove_See_SA_2006_006
SetHandler None
<Files *>
  # Unset Drupal_Security_Do_Not_Remove_See_SA_2013_003
  SetHandler None
  ForceType text/plain
</Files>";

const RDF_EXTENSION: &str = "rdf";

/// A file of the archive directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveFile {
    Archive,
    Series,
    Entity {
        directory: String,
        entity_type: String,
        id: EntityId,
    },
}

impl ArchiveFile {
    /// Path relative to the archive directory.
    pub fn relative_path(&self, archive_code: &str) -> PathBuf {
        match self {
            ArchiveFile::Archive => shared_file_name(archive_code, TemplateKind::Archive),
            ArchiveFile::Series => shared_file_name(archive_code, TemplateKind::Series),
            ArchiveFile::Entity {
                directory,
                entity_type,
                id,
            } => Path::new(directory).join(format!(
                "{directory}_{entity_type}_{id}.{RDF_EXTENSION}"
            )),
        }
    }
}

fn shared_file_name(archive_code: &str, kind: TemplateKind) -> PathBuf {
    let suffix = kind.file_suffix().unwrap_or_default();
    PathBuf::from(format!("{archive_code}{suffix}.{RDF_EXTENSION}"))
}

/// What [`ArchiveWriter::initialize`] did to the directory.
#[derive(Debug, Default)]
pub struct Initialized {
    pub removed: Vec<PathBuf>,
    pub written: Vec<PathBuf>,
}

/// Reads and writes the files of one archive directory.
#[derive(Debug)]
pub struct ArchiveWriter {
    directory: PathBuf,
    archive_code: String,
    base_path: String,
    // Held across the read of the series index and the append that follows it.
    series_lock: Mutex<()>,
}

impl ArchiveWriter {
    pub fn new(settings: &ArchiveSettings) -> Self {
        Self {
            directory: settings.archive_directory(),
            archive_code: settings.archive_code.clone(),
            base_path: settings.base_path.clone(),
            series_lock: Mutex::new(()),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn path_for(&self, file: &ArchiveFile) -> PathBuf {
        self.directory.join(file.relative_path(&self.archive_code))
    }

    /// Prepares the archive directory from scratch.
    ///
    /// Creates the directory, removes every `.rdf` file in it, writes the
    /// `.htaccess` override and then the archive record. This is destructive:
    /// series and entity records have to be published again afterwards.
    pub fn initialize(&self, archive_template: &Template) -> Outcome<Initialized> {
        let mut outcome = Outcome::new(Initialized::default());

        if self.base_path.trim().is_empty() {
            error!("Archive base path is empty, refusing to initialize");
            outcome.warnings.push(RepecError::EmptyBasePath);
            return outcome;
        }
        if self.archive_code.trim().is_empty() {
            error!("Archive code is empty, refusing to initialize");
            outcome.warnings.push(RepecError::EmptyArchiveCode);
            return outcome;
        }

        if let Err(source) = fs::create_dir_all(&self.directory) {
            error!(error = ?source, path = %self.directory.display(), "Failed to create archive directory");
            outcome.warnings.push(RepecError::CreateDirectory {
                path: self.directory.clone(),
                source,
            });
            return outcome;
        }
        debug!(path = %self.directory.display(), "Archive directory ready");

        match self.remove_rdf_files() {
            Ok(removed) => outcome.value.removed = removed,
            Err(e) => outcome.warnings.push(e),
        }

        let htaccess = self.directory.join(HTACCESS_FILE);
        match fs::write(&htaccess, HTACCESS_CONTENT) {
            Ok(()) => outcome.value.written.push(htaccess),
            Err(source) => {
                error!(error = ?source, path = %htaccess.display(), "Failed to write directory index override");
                outcome.warnings.push(RepecError::WriteFile {
                    file_name: HTACCESS_FILE.to_string(),
                    source,
                });
            }
        }

        match self.create(archive_template, &ArchiveFile::Archive) {
            Ok(path) => outcome.value.written.push(path),
            Err(e) => outcome.warnings.push(e),
        }

        info!(
            path = %self.directory.display(),
            removed = outcome.value.removed.len(),
            written = outcome.value.written.len(),
            warnings = outcome.warnings.len(),
            "Archive initialized"
        );
        outcome
    }

    fn remove_rdf_files(&self) -> Result<Vec<PathBuf>, RepecError> {
        let entries = fs::read_dir(&self.directory).map_err(|source| RepecError::DeleteFile {
            path: self.directory.clone(),
            source,
        })?;

        let mut removed = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let is_rdf = path.extension().is_some_and(|ext| ext == RDF_EXTENSION);
            if !is_rdf || !path.is_file() {
                continue;
            }
            fs::remove_file(&path).map_err(|source| RepecError::DeleteFile {
                path: path.clone(),
                source,
            })?;
            debug!(path = %path.display(), "Removed stale archive file");
            removed.push(path);
        }
        Ok(removed)
    }

    /// Writes `template` to `file`, replacing any previous content.
    pub fn create(&self, template: &Template, file: &ArchiveFile) -> Result<PathBuf, RepecError> {
        let path = self.path_for(file);
        let write_error = |source: std::io::Error| RepecError::WriteFile {
            file_name: display_name(&path),
            source,
        };

        if let ArchiveFile::Entity { .. } = file {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(write_error)?;
            }
        }

        fs::write(&path, template.to_redif()).map_err(|source| {
            error!(error = ?source, path = %path.display(), "Failed to write template");
            write_error(source)
        })?;
        info!(path = %path.display(), pairs = template.len(), "Template written");
        Ok(path)
    }

    /// Appends `template` to `file`, followed by the blank line separating records.
    pub fn append(&self, template: &Template, file: &ArchiveFile) -> Result<PathBuf, RepecError> {
        let path = self.path_for(file);
        let mut record = template.to_redif();
        record.push('\n');

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut f| f.write_all(record.as_bytes()))
            .map_err(|source| {
                error!(error = ?source, path = %path.display(), "Failed to append template");
                RepecError::WriteFile {
                    file_name: display_name(&path),
                    source,
                }
            })?;
        info!(path = %path.display(), pairs = template.len(), "Template appended");
        Ok(path)
    }

    fn series_index_lacks(&self, serie_name: &str) -> Result<bool, RepecError> {
        let path = self.path_for(&ArchiveFile::Series);
        if !path.exists() {
            return Ok(true);
        }
        let content = fs::read_to_string(&path)
            .map_err(|source| RepecError::ReadIndex { path, source })?;
        Ok(!content.contains(&format!("Name: {serie_name}")))
    }

    /// Whether the series of `mapping` still needs a record in the series index.
    ///
    /// Matches on the literal text `Name: <serie_name>` anywhere in the index, so a
    /// series whose name contains another series' name counts as present.
    /// An unreadable index answers `false`.
    pub fn should_create_series_template(&self, mapping: &BundleMapping) -> bool {
        self.series_index_lacks(&mapping.serie_name)
            .unwrap_or_else(|e| {
                warn!(error = %e, "Series index unreadable, not appending");
                false
            })
    }

    /// Appends the series record unless the index already names the series.
    ///
    /// Check and append run under one lock, so concurrent publications through
    /// the same writer never duplicate a series. Returns whether a record was written.
    pub fn append_series_template(
        &self,
        mapping: &BundleMapping,
        template: &Template,
    ) -> Result<bool, RepecError> {
        let _guard = self.series_lock.lock().unwrap_or_else(|e| e.into_inner());
        if !self.series_index_lacks(&mapping.serie_name)? {
            debug!(serie_name = %mapping.serie_name, "Series already indexed");
            return Ok(false);
        }
        self.append(template, &ArchiveFile::Series)?;
        Ok(true)
    }

    /// Removes `file` if present. Returns the removed path.
    pub fn delete(&self, file: &ArchiveFile) -> Result<Option<PathBuf>, RepecError> {
        let path = self.path_for(file);
        if !path.exists() {
            debug!(path = %path.display(), "Nothing to delete");
            return Ok(None);
        }
        fs::remove_file(&path).map_err(|source| {
            error!(error = ?source, path = %path.display(), "Failed to delete template");
            RepecError::DeleteFile {
                path: path.clone(),
                source,
            }
        })?;
        info!(path = %path.display(), "Template deleted");
        Ok(Some(path))
    }

    /// Removes the entity file of `entity`, located through the series directory convention.
    pub fn delete_entity_template(
        &self,
        series: SeriesType,
        mapping: &BundleMapping,
        entity: &dyn ContentEntity,
    ) -> Result<Option<PathBuf>, RepecError> {
        let file = series.entity_file(mapping, entity)?;
        self.delete(&file)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
