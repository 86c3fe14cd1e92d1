//! Error types for marginalia operations.

use thiserror::Error;

/// Errors that abort opening a book or loading configuration.
///
/// Everything recoverable (a missing table of contents, an unresolvable
/// highlight, a stale visibility event) is handled locally and never becomes
/// an `Error`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("truncated archive: {what} at offset {offset}")]
    Truncated { offset: usize, what: &'static str },

    #[error("unsupported compression method {method} for entry {name}")]
    UnsupportedCompression { name: String, method: u16 },

    #[error("failed to decompress entry {name}: {source}")]
    Decompress {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("missing container pointer (META-INF/container.xml)")]
    MissingContainer,

    #[error("container.xml does not reference a package document")]
    MissingPackageReference,

    #[error("package document not found in archive: {0}")]
    MissingPackage(String),

    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl Error {
    /// True for failures caused by the archive or package structure itself.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Error::Truncated { .. }
                | Error::UnsupportedCompression { .. }
                | Error::Decompress { .. }
                | Error::MissingContainer
                | Error::MissingPackageReference
                | Error::MissingPackage(_)
        )
    }

    /// Human-readable message for the "cannot open this book" condition.
    pub fn user_message(&self) -> String {
        format!("Cannot open this book: {self}")
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
