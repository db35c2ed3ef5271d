//! Error types for the pipeline.
//!
//! Per-module errors (`GenerateError`, `ExportError`, `PublishError`) are caught
//! at the orchestrator and compiler boundaries and turned into report entries.
//! `PipelineError` is reserved for failures that stop the whole run.

use std::io;
use std::path::PathBuf;

use shared::ParameterError;
use thiserror::Error;

/// Run-fatal failures.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The design root does not exist or is not a directory.
    #[error("design root {0} is not a directory")]
    MissingRoot(PathBuf),

    /// A directory could not be read while walking the design tree.
    #[error("failed to read {path}: {source}")]
    Discovery {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The aggregate catalog could not be written.
    #[error("failed to write catalog {path}: {source}")]
    CatalogWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize catalog: {0}")]
    CatalogSerialize(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No module with the requested id was discovered.
    #[error("no design module with id '{0}'")]
    UnknownModule(String),

    /// A single-module command hit a per-module failure.
    #[error("module '{id}' failed during {phase}: {message}")]
    Module {
        id: String,
        phase: &'static str,
        message: String,
    },
}

/// Failures loading `design-pipeline.json`.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config field '{0}' must not be empty")]
    Empty(&'static str),
}

/// Failures inside a module's `generate`.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error("design has no operations")]
    Empty,

    #[error("object '{0}' not found")]
    UnknownObject(String),

    #[error("boolean '{0}' has no right-hand operands")]
    NoOperands(String),

    #[error("object id '{0}' is defined twice")]
    DuplicateObject(String),

    #[error("object '{object}': {field} must be a positive finite number, got {value}")]
    InvalidDimension {
        object: String,
        field: &'static str,
        value: f64,
    },

    #[error("object '{object}': {field} evaluated to {value}")]
    NonFinite {
        object: String,
        field: &'static str,
        value: f64,
    },

    #[error("repeat '{object}': count must be a positive integer, got {value}")]
    InvalidCount { object: String, value: f64 },

    /// Failure raised by a hand-written module.
    #[error("{0}")]
    Custom(String),
}

/// Failures turning a solid into mesh bytes.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("solid produced an empty mesh")]
    EmptyMesh,

    #[error("mesh index {index} out of range for {vertices} vertices")]
    IndexOutOfRange { index: u32, vertices: usize },

    #[error("mesh has {0} triangles, more than STL can hold")]
    TooManyTriangles(usize),
}

/// Failures writing an artifact to one of the publish sinks.
#[derive(Error, Debug)]
#[error("sink '{sink}' failed to write {path}: {source}")]
pub struct PublishError {
    pub sink: String,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}
