/// `load_config` module: reads the YAML configuration of the CLI into the archive settings
/// and the locations of the bundle store and the content dump.
///
/// # Responsibilities
/// - Parse the user-supplied YAML file into [`CliConfig`]
/// - Apply environment overrides (`REPEC_PUBLIC_DIR`, `REPEC_BUNDLE_STORE`), so a deployment
///   can point the same file at another public file area
/// - Fail with clear diagnostics: every failure names the file and the step that broke
///
/// # Errors
/// All errors in this module use `anyhow::Error` and are surfaced at the CLI boundary.
///
/// Accepted layout:
///
/// ```yaml
/// archive:
///   public_dir: ./public
///   public_url_path: /sites/default/files/
///   base_path: RePEc
///   archive_code: tst
///   provider_name: Test Institute
///   provider_homepage: https://example.org
///   provider_institution: RePEc:edi:tstinus
///   maintainer_name: Jo Maintainer
///   maintainer_email: jo@example.org
/// bundle_store: ./repec-bundles.json
/// content: ./content.yaml
/// ```
use anyhow::Result;
use repec_archive_core::settings::ArchiveSettings;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub const PUBLIC_DIR_ENV: &str = "REPEC_PUBLIC_DIR";
pub const BUNDLE_STORE_ENV: &str = "REPEC_BUNDLE_STORE";

const DEFAULT_BUNDLE_STORE: &str = "repec-bundles.json";

#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    pub archive: ArchiveSettings,
    /// JSON file holding the per-bundle settings.
    #[serde(default = "default_bundle_store")]
    pub bundle_store: PathBuf,
    /// YAML content dump with the entities to publish and what they reference.
    #[serde(default)]
    pub content: Option<PathBuf>,
}

fn default_bundle_store() -> PathBuf {
    PathBuf::from(DEFAULT_BUNDLE_STORE)
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}

/// Loads the YAML config file and applies the environment overrides.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let mut config: CliConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if let Some(public_dir) = env_override(PUBLIC_DIR_ENV) {
        info!(public_dir = ?public_dir, "Public directory overridden from {PUBLIC_DIR_ENV}");
        config.archive.public_dir = public_dir;
    }
    if let Some(bundle_store) = env_override(BUNDLE_STORE_ENV) {
        info!(bundle_store = ?bundle_store, "Bundle store overridden from {BUNDLE_STORE_ENV}");
        config.bundle_store = bundle_store;
    }

    if config.archive.archive_code.trim().is_empty() {
        warn!(config_path = ?path_ref, "Archive code is empty, init will refuse and handles will be malformed");
    }
    config.archive.trace_loaded();

    Ok(config)
}
