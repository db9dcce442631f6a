use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

/// Scheme prefix of URIs stored in the public file area.
pub const PUBLIC_SCHEME: &str = "public://";

/// Bytes left as-is in a path segment of a public file URL.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Provider-wide archive settings. Built once and shared read-only by every component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveSettings {
    /// Filesystem root of the public file area (where `public://` points to).
    pub public_dir: PathBuf,
    /// URL path of the public file area below the provider homepage, e.g. `/sites/default/files/`.
    #[serde(default)]
    pub public_url_path: String,
    /// Directory below the public file area holding the RePEc archives.
    pub base_path: String,
    /// Three-letter RePEc archive code.
    pub archive_code: String,
    #[serde(default)]
    pub provider_name: String,
    #[serde(default)]
    pub provider_homepage: String,
    #[serde(default)]
    pub provider_institution: String,
    #[serde(default)]
    pub maintainer_name: String,
    #[serde(default)]
    pub maintainer_email: String,
}

impl ArchiveSettings {
    pub fn trace_loaded(&self) {
        info!(
            public_dir = %self.public_dir.display(),
            base_path = %self.base_path,
            archive_code = %self.archive_code,
            "Loaded ArchiveSettings"
        );
        debug!(?self, "ArchiveSettings loaded (full debug)");
    }

    /// `<public_dir>/<base_path>/<archive_code>/`
    pub fn archive_directory(&self) -> PathBuf {
        self.public_dir
            .join(&self.base_path)
            .join(&self.archive_code)
    }

    /// Public URL of the archive directory, as announced in the archive template.
    pub fn archive_url(&self) -> String {
        format!(
            "{}{}{}/{}/",
            self.provider_homepage, self.public_url_path, self.base_path, self.archive_code
        )
    }

    /// Maps a stored file URI to an absolute URL. Only `public://` URIs are rewritten,
    /// each path segment of those is percent-encoded.
    pub fn public_url(&self, uri: &str) -> String {
        match uri.strip_prefix(PUBLIC_SCHEME) {
            Some(relative) => {
                let encoded: Vec<String> = relative
                    .split('/')
                    .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
                    .collect();
                format!(
                    "{}{}{}",
                    self.provider_homepage,
                    self.public_url_path,
                    encoded.join("/")
                )
            }
            None => uri.to_string(),
        }
    }
}
