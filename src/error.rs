//! Error taxonomy shared by the ingestion, tagging, retrieval, and
//! assembly pipeline.
//!
//! Each variant is a distinct failure *kind* so that the transport layer
//! can tell "nothing matched" apart from "the store is unavailable".
//!
//! | Variant | Raised by | Handling |
//! |---------|-----------|----------|
//! | [`Error::Config`] | config / ontology loading | fatal for the cycle |
//! | [`Error::Archive`] | archive reading | fatal, nothing is written |
//! | [`Error::NotFound`] | id resolution | skipped during assembly |
//! | [`Error::Validation`] | offset integrity checks | fatal |
//! | [`Error::Store`] | storage backends | propagated |

/// Errors produced by the evidence pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: i64 },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Store(err.to_string())
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::Archive(err.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
