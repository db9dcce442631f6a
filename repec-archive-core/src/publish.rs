//! High-level pipeline: bundle settings → series type → template → archive files.
//!
//! This module ties the engine together for the entity lifecycle:
//!   - Initializes the archive directory (directory, stale file cleanup, `.htaccess`, archive record)
//!   - Builds entity templates from the bundle mapping and the entity's series type
//!   - Keeps the series index in sync (one record per series name)
//!   - Creates, re-creates and deletes entity files
//!
//! # Major Types
//! - [`Publisher`]: owns settings, collaborators, the archive writer and the alteration hooks
//! - [`Report`]: files touched and warnings raised by one operation
//!
//! # Error Handling
//! No step aborts the operation it belongs to unless it leaves nothing to work
//! with (e.g. a bundle without series type). A failed series append still lets
//! the entity file be written; every failure ends up in [`Report::warnings`].

use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use crate::archive::{ArchiveFile, ArchiveWriter};
use crate::builder::{AlterHooks, TemplateBuilder};
use crate::bundle::{BundleMapping, BundleSettings};
use crate::contract::{ConfigStore, ContentEntity, ReferenceLoader};
use crate::error::{Outcome, RepecError};
use crate::series::SeriesType;
use crate::settings::ArchiveSettings;
use crate::template::Template;

/// Files touched and warnings raised by a publisher operation.
#[derive(Debug, Default)]
pub struct Report {
    pub written: Vec<PathBuf>,
    pub appended: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    pub warnings: Vec<RepecError>,
}

impl Report {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    fn absorb<T>(&mut self, outcome: Outcome<T>) -> T {
        outcome.absorb_into(&mut self.warnings)
    }

    /// Appends everything `other` recorded.
    pub fn merge(&mut self, other: Report) {
        self.written.extend(other.written);
        self.appended.extend(other.appended);
        self.removed.extend(other.removed);
        self.warnings.extend(other.warnings);
    }
}

/// Entry point for publishing entities into a RePEc archive.
pub struct Publisher<L, S> {
    settings: ArchiveSettings,
    loader: L,
    bundles: BundleSettings<S>,
    writer: ArchiveWriter,
    hooks: AlterHooks,
}

impl<L: ReferenceLoader, S: ConfigStore> Publisher<L, S> {
    pub fn new(settings: ArchiveSettings, loader: L, store: S) -> Self {
        let writer = ArchiveWriter::new(&settings);
        Self {
            settings,
            loader,
            bundles: BundleSettings::new(store),
            writer,
            hooks: AlterHooks::new(),
        }
    }

    pub fn with_hooks(mut self, hooks: AlterHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn hooks_mut(&mut self) -> &mut AlterHooks {
        &mut self.hooks
    }

    pub fn settings(&self) -> &ArchiveSettings {
        &self.settings
    }

    pub fn bundles(&self) -> &BundleSettings<S> {
        &self.bundles
    }

    pub fn writer(&self) -> &ArchiveWriter {
        &self.writer
    }

    pub fn builder(&self) -> TemplateBuilder<'_, L> {
        TemplateBuilder::new(&self.settings, &self.loader, &self.hooks)
    }

    /// Series types an entity bundle can be mapped to, with their labels.
    pub fn available_series() -> Vec<(SeriesType, &'static str)> {
        SeriesType::ALL.iter().map(|s| (*s, s.label())).collect()
    }

    fn bundle_context(
        &self,
        entity: &dyn ContentEntity,
    ) -> Result<(BundleMapping, SeriesType), RepecError> {
        let mapping = self
            .bundles
            .mapping(entity.entity_type_id(), entity.bundle())?;
        let series = mapping
            .serie_type
            .ok_or_else(|| RepecError::MissingSeriesType {
                entity_type: entity.entity_type_id().to_string(),
                bundle: entity.bundle().to_string(),
            })?;
        Ok((mapping, series))
    }

    /// Resets the archive directory and writes the archive record.
    pub fn initialize_archive(&self) -> Report {
        info!(archive_code = %self.settings.archive_code, "[PUBLISH] Initializing archive");
        let mut report = Report::default();
        let initialized = report.absorb(self.writer.initialize(&self.builder().archive_template()));
        report.written = initialized.written;
        report.removed = initialized.removed;
        report
    }

    /// Whether publication is switched on for the entity's bundle.
    pub fn is_bundle_enabled(&self, entity: &dyn ContentEntity) -> Result<bool, RepecError> {
        Ok(self
            .bundles
            .mapping(entity.entity_type_id(), entity.bundle())?
            .enabled)
    }

    /// Whether the entity passes the bundle's field restriction, if any.
    ///
    /// With `restriction_by_field` set, only entities whose restriction field
    /// holds `1` as first value are shareable.
    pub fn is_entity_shareable(&self, entity: &dyn ContentEntity) -> Result<bool, RepecError> {
        let mapping = self
            .bundles
            .mapping(entity.entity_type_id(), entity.bundle())?;
        if !mapping.restriction_by_field {
            return Ok(true);
        }
        let flag = entity
            .field_values(&mapping.restriction_field)
            .first()
            .and_then(|item| item.value.as_deref());
        Ok(flag.map(str::trim) == Some("1"))
    }

    /// The entity template, or `None` when the bundle has no usable configuration.
    pub fn entity_template(&self, entity: &dyn ContentEntity) -> Outcome<Option<Template>> {
        match self.bundle_context(entity) {
            Ok((mapping, series)) => self
                .builder()
                .entity_template(entity, &mapping, series)
                .map(Some),
            Err(e) => {
                warn!(entity_id = entity.id(), error = %e, "[PUBLISH] No template for entity");
                Outcome::with_warning(None, e)
            }
        }
    }

    fn ensure_series(&self, mapping: &BundleMapping, series: SeriesType, report: &mut Report) {
        let template = self.builder().series_template(mapping, series);
        match self.writer.append_series_template(mapping, &template) {
            Ok(true) => {
                info!(serie_name = %mapping.serie_name, "[PUBLISH] Series record appended");
                report
                    .appended
                    .push(self.writer.path_for(&ArchiveFile::Series));
            }
            Ok(false) => debug!(serie_name = %mapping.serie_name, "[PUBLISH] Series already present"),
            Err(e) => {
                error!(error = %e, "[PUBLISH][ERROR] Series record could not be appended");
                report.warnings.push(e);
            }
        }
    }

    /// Appends the series record of the entity's bundle when it is not indexed yet.
    pub fn create_series_template(&self, entity: &dyn ContentEntity) -> Report {
        let mut report = Report::default();
        match self.bundle_context(entity) {
            Ok((mapping, series)) => self.ensure_series(&mapping, series, &mut report),
            Err(e) => report.warnings.push(e),
        }
        report
    }

    /// Builds and writes the entity file, making sure its series is indexed.
    pub fn create_entity_template(&self, entity: &dyn ContentEntity) -> Report {
        info!(
            entity_type = entity.entity_type_id(),
            bundle = entity.bundle(),
            entity_id = entity.id(),
            "[PUBLISH] Creating entity template"
        );
        let mut report = Report::default();
        let (mapping, series) = match self.bundle_context(entity) {
            Ok(context) => context,
            Err(e) => {
                error!(entity_id = entity.id(), error = %e, "[PUBLISH][ERROR] Bundle not publishable");
                report.warnings.push(e);
                return report;
            }
        };

        let template = report.absorb(self.builder().entity_template(entity, &mapping, series));
        self.ensure_series(&mapping, series, &mut report);

        match series.create(&self.writer, &template, &mapping, entity) {
            Ok(path) => report.written.push(path),
            Err(e) => {
                error!(entity_id = entity.id(), error = %e, "[PUBLISH][ERROR] Entity template not written");
                report.warnings.push(e);
            }
        }
        report
    }

    /// Entity files are rebuilt from scratch on update.
    pub fn update_entity_template(&self, entity: &dyn ContentEntity) -> Report {
        self.create_entity_template(entity)
    }

    pub fn delete_entity_template(&self, entity: &dyn ContentEntity) -> Report {
        info!(
            entity_type = entity.entity_type_id(),
            entity_id = entity.id(),
            "[PUBLISH] Deleting entity template"
        );
        let mut report = Report::default();
        let result = self
            .bundle_context(entity)
            .and_then(|(mapping, series)| {
                self.writer.delete_entity_template(series, &mapping, entity)
            });
        match result {
            Ok(Some(path)) => report.removed.push(path),
            Ok(None) => {}
            Err(e) => {
                error!(entity_id = entity.id(), error = %e, "[PUBLISH][ERROR] Entity template not deleted");
                report.warnings.push(e);
            }
        }
        report
    }

    /// Creates the entity file when the bundle is enabled and the entity shareable.
    pub fn publish_entity(&self, entity: &dyn ContentEntity) -> Report {
        let eligible = self
            .is_bundle_enabled(entity)
            .and_then(|enabled| Ok(enabled && self.is_entity_shareable(entity)?));
        match eligible {
            Ok(true) => self.create_entity_template(entity),
            Ok(false) => {
                debug!(
                    entity_type = entity.entity_type_id(),
                    bundle = entity.bundle(),
                    entity_id = entity.id(),
                    "[PUBLISH] Entity skipped, bundle disabled or entity restricted"
                );
                Report::default()
            }
            Err(e) => Report {
                warnings: vec![e],
                ..Report::default()
            },
        }
    }
}
