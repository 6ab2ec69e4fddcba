use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum KiraError {
    #[error("dependency not populated: {dependency}")]
    #[diagnostic(help("populate {dependency} before loading HIPPIE"))]
    PreconditionNotMet { dependency: String },

    #[error("row {row}: {role} endpoint {identifier} was never registered")]
    UnresolvedEndpoint {
        row: usize,
        role: &'static str,
        identifier: String,
        accession: Option<String>,
    },

    #[error("invalid namespace: {0} (expected one of uniprot, ncbigene, hgnc)")]
    InvalidNamespace(String),

    #[error(
        "row {row}: entrez id {entrez_id} is registered with accession {registered} but also maps to {incoming}"
    )]
    DedupConflict {
        row: usize,
        entrez_id: String,
        registered: String,
        incoming: String,
    },

    #[error("entrez id {0} already stored")]
    DuplicateEntrez(String),

    #[error("database is already populated; reset it first")]
    AlreadyPopulated,

    #[error("{source_name} line {line}: {message}")]
    MalformedRow {
        source_name: &'static str,
        line: u64,
        message: String,
    },

    #[error("config file not found at {0}")]
    MissingConfig(PathBuf),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("download failed: {0}")]
    Http(String),

    #[error("server returned status {status} for {url}: {message}")]
    HttpStatus {
        url: String,
        status: u16,
        message: String,
    },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl KiraError {
    pub(crate) fn storage(err: impl std::fmt::Display) -> Self {
        KiraError::Storage(err.to_string())
    }

    pub(crate) fn filesystem(err: impl std::fmt::Display) -> Self {
        KiraError::Filesystem(err.to_string())
    }
}
