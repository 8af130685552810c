use super::format::FormatKind;
use crate::core::models::topology::TopologyError;
use crate::core::topology::types::TypeLookupError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unexpected end of file in '{path}' at byte {position}: expected {expected}")]
    UnexpectedEof {
        path: PathBuf,
        position: u64,
        expected: String,
    },
    #[error("{format} parse error in '{path}' at byte {position}: {kind}")]
    Parse {
        format: FormatKind,
        path: PathBuf,
        position: u64,
        kind: ParseErrorKind,
    },
    #[error("the {format} format does not support {operation}")]
    Unsupported {
        format: FormatKind,
        operation: &'static str,
    },
    #[error("value too wide for the {format} format: {context}")]
    ValueTooWide { format: FormatKind, context: String },
    #[error("invalid topology: {0}")]
    Topology(#[from] TopologyError),
    #[error(transparent)]
    TypeLookup(#[from] TypeLookupError),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseErrorKind {
    #[error("expected {expected}, found '{found}'")]
    Unexpected { expected: String, found: String },
    #[error("invalid integer for {field} (value: '{value}')")]
    InvalidInt { field: String, value: String },
    #[error("invalid number for {field} (value: '{value}')")]
    InvalidFloat { field: String, value: String },
    #[error("{record} line is too short (expected at least {expected} characters, found {found})")]
    LineTooShort {
        record: String,
        expected: usize,
        found: usize,
    },
    #[error("{0}")]
    Invalid(String),
}

pub type FormatResult<T> = Result<T, FormatError>;
