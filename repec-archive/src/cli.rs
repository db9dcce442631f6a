/// # repec-archive CLI interface
///
/// Command parsing and orchestration for the `repec-archive` binary. The archive
/// engine itself (templates, series types, archive files, bundle settings) lives in
/// [`repec-archive-core`]; this module only wires configuration, the content dump
/// and the bundle store into a [`Publisher`] and prints what happened.
///
/// ## How To Use
/// - Command line: `repec-archive --help`.
/// - Programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// ## Exit status
/// Commands driving the publisher print every file they touched on stdout and every
/// warning on stderr. Any warning makes [`run`] return an error.
///
/// [`repec-archive-core`]: ../../repec-archive-core/
use crate::content::{select, ContentDump, References};
use crate::load_config::{load_config, CliConfig};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use repec_archive_core::bundle::{BundleMapping, BundleSettings};
use repec_archive_core::contract::EntityId;
use repec_archive_core::publish::{Publisher, Report};
use repec_archive_core::store::JsonFileConfigStore;
use serde_json::{Map, Value};
use std::path::PathBuf;

type CliPublisher = Publisher<References, JsonFileConfigStore>;

/// CLI for repec-archive: publish content records as a RePEc archive.
#[derive(Parser)]
#[clap(
    name = "repec-archive",
    version,
    about = "Publish content records as RePEc ReDIF templates for harvesting"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reset the archive directory and write the archive record
    Init {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Publish the entities of the content dump that are enabled and shareable
    Publish {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Only publish entities of this type
        #[clap(long)]
        entity_type: Option<String>,
        /// Only publish the entity with this id
        #[clap(long)]
        id: Option<EntityId>,
    },
    /// Remove the archive file of one entity of the content dump
    Delete {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        #[clap(long)]
        entity_type: String,
        #[clap(long)]
        id: EntityId,
    },
    /// Inspect or change the settings of an entity bundle
    Bundle {
        #[clap(subcommand)]
        action: BundleCommand,
    },
    /// List the supported series types
    Series,
}

#[derive(Subcommand)]
pub enum BundleCommand {
    /// Print every setting of the bundle, defaults included, as JSON
    Show {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        #[clap(long)]
        entity_type: String,
        #[clap(long)]
        bundle: String,
    },
    /// Change settings of the bundle; unchanged settings keep their value
    Set {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        #[clap(long)]
        entity_type: String,
        #[clap(long)]
        bundle: String,
        /// A setting to change, repeatable
        #[clap(long = "set", value_name = "KEY=VALUE", required = true)]
        values: Vec<String>,
    },
}

fn open_publisher(config: &CliConfig, references: References) -> CliPublisher {
    Publisher::new(
        config.archive.clone(),
        references,
        JsonFileConfigStore::new(&config.bundle_store),
    )
}

fn open_bundles(config: &CliConfig) -> BundleSettings<JsonFileConfigStore> {
    BundleSettings::new(JsonFileConfigStore::new(&config.bundle_store))
}

fn load_content(config: &CliConfig) -> Result<ContentDump> {
    let path = config
        .content
        .as_ref()
        .ok_or_else(|| anyhow!("No content dump configured, set `content` in the config file"))?;
    ContentDump::load(path)
}

/// Prints the report and turns warnings into an error.
fn finish(command: &str, report: Report) -> Result<()> {
    for path in &report.removed {
        println!("removed {}", path.display());
    }
    for path in &report.written {
        println!("written {}", path.display());
    }
    for path in &report.appended {
        println!("appended {}", path.display());
    }
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }

    if report.is_clean() {
        tracing::info!(
            command,
            written = report.written.len(),
            appended = report.appended.len(),
            removed = report.removed.len(),
            "Command complete"
        );
        Ok(())
    } else {
        tracing::error!(command, warnings = report.warnings.len(), "Command finished with warnings");
        Err(anyhow!(
            "{command} finished with {} warning(s)",
            report.warnings.len()
        ))
    }
}

/// Parses a `KEY=VALUE` argument, typed after the setting's default.
fn parse_setting(raw: &str) -> Result<(String, Value)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected KEY=VALUE, got {raw:?}"))?;
    let key = key.trim();
    let value = match BundleSettings::<JsonFileConfigStore>::defaults().get(key) {
        Some(Value::Bool(_)) => match value.trim() {
            "true" | "1" => Value::Bool(true),
            "false" | "0" => Value::Bool(false),
            other => bail!("Setting {key} expects true or false, got {other:?}"),
        },
        Some(_) => Value::String(value.to_string()),
        None => bail!("Unknown bundle setting {key:?}"),
    };
    Ok((key.to_string(), value))
}

fn print_settings(settings: Map<String, Value>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&Value::Object(settings))?);
    Ok(())
}

/// CLI entrypoint for integration tests and main()
pub fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Init { config } => {
            let config = load_config(config)?;
            tracing::info!(command = "init", "Initializing archive");
            let publisher = open_publisher(&config, References::default());
            finish("init", publisher.initialize_archive())
        }
        Commands::Publish {
            config,
            entity_type,
            id,
        } => {
            let config = load_config(config)?;
            let ContentDump {
                references,
                entities,
            } = load_content(&config)?;
            let publisher = open_publisher(&config, references);

            tracing::info!(command = "publish", ?entity_type, ?id, "Publishing entities");
            let mut report = Report::default();
            let mut selected = 0usize;
            for entity in select(&entities, entity_type.as_deref(), id) {
                selected += 1;
                report.merge(publisher.publish_entity(entity));
            }
            if selected == 0 {
                tracing::warn!(command = "publish", "No entity of the content dump matched");
            }
            finish("publish", report)
        }
        Commands::Delete {
            config,
            entity_type,
            id,
        } => {
            let config = load_config(config)?;
            let ContentDump {
                references,
                entities,
            } = load_content(&config)?;
            let entity = select(&entities, Some(entity_type.as_str()), Some(id))
                .next()
                .ok_or_else(|| anyhow!("Entity {entity_type} {id} is not in the content dump"))?;
            let publisher = open_publisher(&config, references);
            finish("delete", publisher.delete_entity_template(entity))
        }
        Commands::Bundle { action } => match action {
            BundleCommand::Show {
                config,
                entity_type,
                bundle,
            } => {
                let config = load_config(config)?;
                let settings = open_bundles(&config).get_all(&entity_type, &bundle)?;
                print_settings(settings)
            }
            BundleCommand::Set {
                config,
                entity_type,
                bundle,
                values,
            } => {
                let config = load_config(config)?;
                let bundles = open_bundles(&config);

                let mut settings = bundles.get_all(&entity_type, &bundle)?;
                for raw in &values {
                    let (key, value) = parse_setting(raw)?;
                    settings.insert(key, value);
                }
                serde_json::from_value::<BundleMapping>(Value::Object(settings.clone()))
                    .with_context(|| format!("Invalid settings for bundle {entity_type}.{bundle}"))?;

                bundles.set(&settings, &entity_type, &bundle)?;
                tracing::info!(command = "bundle set", %entity_type, %bundle, "Bundle settings stored");
                print_settings(bundles.get_all(&entity_type, &bundle)?)
            }
        },
        Commands::Series => {
            for (series, label) in CliPublisher::available_series() {
                println!("{}\t{}\t{}", series.code(), series.series_type(), label);
            }
            Ok(())
        }
    }
}
