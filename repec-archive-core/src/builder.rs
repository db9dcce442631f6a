//! Template assembly: archive, series and entity templates.
//!
//! Entity templates go through the registered [`AlterHooks`] after field
//! resolution: first every generic hook, then the hooks registered for the
//! entity's series type, each list in registration order.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::bundle::BundleMapping;
use crate::contract::{ContentEntity, ReferenceLoader};
use crate::error::Outcome;
use crate::resolve::AttributeResolver;
use crate::series::SeriesType;
use crate::settings::ArchiveSettings;
use crate::template::{Template, TemplateKind};

/// A callback allowed to append, remove or rewrite pairs of an entity template.
pub type AlterHook = Box<dyn Fn(&mut Template, &dyn ContentEntity) + Send + Sync>;

/// Registered alteration hooks.
#[derive(Default)]
pub struct AlterHooks {
    generic: Vec<AlterHook>,
    per_series: HashMap<SeriesType, Vec<AlterHook>>,
}

impl AlterHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a hook run for every entity template.
    pub fn register<F>(&mut self, hook: F)
    where
        F: Fn(&mut Template, &dyn ContentEntity) + Send + Sync + 'static,
    {
        self.generic.push(Box::new(hook));
    }

    /// Registers a hook run only for templates of `series`.
    pub fn register_for<F>(&mut self, series: SeriesType, hook: F)
    where
        F: Fn(&mut Template, &dyn ContentEntity) + Send + Sync + 'static,
    {
        self.per_series.entry(series).or_default().push(Box::new(hook));
    }

    pub fn apply(&self, series: SeriesType, template: &mut Template, entity: &dyn ContentEntity) {
        for hook in &self.generic {
            hook(template, entity);
        }
        if let Some(hooks) = self.per_series.get(&series) {
            for hook in hooks {
                hook(template, entity);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.generic.is_empty() && self.per_series.values().all(Vec::is_empty)
    }
}

impl fmt::Debug for AlterHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlterHooks")
            .field("generic", &self.generic.len())
            .field(
                "per_series",
                &self
                    .per_series
                    .iter()
                    .map(|(series, hooks)| (series.code(), hooks.len()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// The archive-level record announcing the provider.
pub fn archive_template(settings: &ArchiveSettings) -> Template {
    let mut template = Template::new(TemplateKind::Archive);
    template.push("Template-Type", "ReDIF-Archive 1.0");
    template.push("Handle", format!("RePEc:{}", settings.archive_code));
    template.push("Name", settings.provider_name.as_str());
    template.push("Maintainer-Name", settings.maintainer_name.as_str());
    template.push("Maintainer-Email", settings.maintainer_email.as_str());
    template.push(
        "Description",
        format!(
            "This archive collects publications from {}",
            settings.provider_name
        ),
    );
    template.push("URL", settings.archive_url());
    template
}

/// The series index record of a bundle.
pub fn series_template(
    settings: &ArchiveSettings,
    mapping: &BundleMapping,
    series: SeriesType,
) -> Template {
    let mut template = Template::new(TemplateKind::Series);
    template.push("Template-Type", "ReDIF-Series 1.0");
    template.push("Name", mapping.serie_name.as_str());
    template.push("Provider-Name", settings.provider_name.as_str());
    template.push("Provider-Homepage", settings.provider_homepage.as_str());
    template.push("Provider-Institution", settings.provider_institution.as_str());
    template.push("Maintainer-Name", settings.maintainer_name.as_str());
    template.push("Maintainer-Email", settings.maintainer_email.as_str());
    template.push("Type", series.series_type());
    template.push(
        "Handle",
        format!("RePEc:{}:{}", settings.archive_code, series.code()),
    );
    template
}

/// Builds templates for one archive.
pub struct TemplateBuilder<'a, L: ?Sized> {
    settings: &'a ArchiveSettings,
    resolver: AttributeResolver<'a, L>,
    hooks: &'a AlterHooks,
}

impl<'a, L: ReferenceLoader + ?Sized> TemplateBuilder<'a, L> {
    pub fn new(settings: &'a ArchiveSettings, loader: &'a L, hooks: &'a AlterHooks) -> Self {
        Self {
            settings,
            resolver: AttributeResolver::new(loader, settings),
            hooks,
        }
    }

    pub fn archive_template(&self) -> Template {
        archive_template(self.settings)
    }

    pub fn series_template(&self, mapping: &BundleMapping, series: SeriesType) -> Template {
        series_template(self.settings, mapping, series)
    }

    /// Default header of `series`, then every required field in declared order,
    /// then the alteration hooks.
    pub fn entity_template(
        &self,
        entity: &dyn ContentEntity,
        mapping: &BundleMapping,
        series: SeriesType,
    ) -> Outcome<Template> {
        let mut template = series.default_template(&self.settings.archive_code, entity);
        let mut warnings = Vec::new();

        for field in series.required_fields() {
            let pairs = self
                .resolver
                .resolve(entity, mapping, field.key, field.label)
                .absorb_into(&mut warnings);
            template.extend(pairs);
        }

        self.hooks.apply(series, &mut template, entity);
        debug!(
            entity_id = entity.id(),
            series = series.code(),
            pairs = template.len(),
            "Entity template built"
        );

        Outcome {
            value: template,
            warnings,
        }
    }
}
