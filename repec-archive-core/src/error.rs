//! Error taxonomy for the archive engine.
//!
//! Nothing in the engine is fatal. Configuration, resolution and persistence
//! problems are collected as [`RepecError`] warnings next to whatever partial
//! result was produced, see [`Outcome`].

use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by a [`crate::contract::ReferenceLoader`].
#[derive(Debug, Error)]
pub enum LoadError {
    /// A referenced entity does not exist (stale reference).
    #[error("{kind} {id} could not be loaded")]
    Missing { kind: &'static str, id: u64 },

    /// The backing storage failed.
    #[error("reference storage failed: {0}")]
    Backend(String),
}

/// Failure reported by a [`crate::contract::ConfigStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("config store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("config store content is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Non-fatal problems surfaced to the caller.
#[derive(Debug, Error)]
pub enum RepecError {
    #[error("The base path cannot be empty.")]
    EmptyBasePath,

    #[error("The archive code cannot be empty.")]
    EmptyArchiveCode,

    #[error("Directory {path} could not be created: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File {file_name} could not be created: {source}")]
    WriteFile {
        file_name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File {path} could not be deleted: {source}")]
    DeleteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Series index {path} could not be read: {source}")]
    ReadIndex {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("The series directory for bundle {entity_type}.{bundle} is empty.")]
    EmptyDirectory { entity_type: String, bundle: String },

    #[error("The series directory {directory:?} for bundle {entity_type}.{bundle} must be a single directory name.")]
    InvalidDirectory {
        entity_type: String,
        bundle: String,
        directory: String,
    },

    #[error("Bundle {entity_type}.{bundle} has no series type configured.")]
    MissingSeriesType { entity_type: String, bundle: String },

    #[error("Field {field} could not be resolved: {source}")]
    Reference {
        field: String,
        #[source]
        source: LoadError,
    },

    #[error("Value {value:?} of field {field} is not a date")]
    InvalidDate { field: String, value: String },

    #[error("Bundle settings for {key} could not be accessed: {source}")]
    Store {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("Bundle settings for {key} are malformed: {source}")]
    InvalidBundleSettings {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A value together with the warnings raised while producing it.
#[derive(Debug)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<RepecError>,
}

impl<T> Outcome<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn with_warning(value: T, warning: RepecError) -> Self {
        Self {
            value,
            warnings: vec![warning],
        }
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Moves the warnings of `self` into `sink` and returns the value.
    pub fn absorb_into(self, sink: &mut Vec<RepecError>) -> T {
        sink.extend(self.warnings);
        self.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            warnings: self.warnings,
        }
    }
}
