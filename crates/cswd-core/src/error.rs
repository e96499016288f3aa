//! Engine error taxonomy.
//!
//! Translation-time and validation errors carry a locator naming the
//! offending token and are never retried. Transient backend failures are
//! retried a bounded number of times at the repository boundary before
//! surfacing as `Repository`.

use cswd_proto::{ExceptionCode, ExceptionReport};
use thiserror::Error;

/// Catalogue engine errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid mapping or profile configuration. Raised during setup and
    /// `remap`; the previous registry snapshot stays intact.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A caller-supplied parameter or token failed validation.
    #[error("invalid value for {locator}: {message}")]
    InvalidParameterValue { locator: String, message: String },

    /// A required parameter was absent.
    #[error("missing required parameter {locator}")]
    MissingParameterValue { locator: String },

    /// The named operation is not registered for the negotiated version.
    #[error("operation {locator} is not supported")]
    OperationNotSupported { locator: String },

    /// Constraint text failed to parse (a syntax error, not a semantic one).
    #[error("constraint parsing failed: {message}")]
    OperationParsingFailed { message: String },

    /// No client-acceptable protocol version is supported.
    #[error("version negotiation failed: {message}")]
    VersionNegotiationFailed { message: String },

    /// Client-supplied updateSequence is ahead of the repository.
    #[error("invalid update sequence: {message}")]
    InvalidUpdateSequence { message: String },

    /// Insert of an identifier that already exists.
    #[error("record '{identifier}' already exists")]
    DuplicateIdentifier { identifier: String },

    /// Record lookup by identifier found nothing.
    #[error("record '{identifier}' not found")]
    NotFound { identifier: String },

    /// Backend failure that survived the bounded retry window.
    #[error("repository error: {0}")]
    Repository(String),

    /// Raw backend error.
    #[error("backend error: {0}")]
    Backend(#[from] rusqlite::Error),
}

impl Error {
    /// Convenience constructor for `InvalidParameterValue`.
    pub fn invalid_parameter(locator: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidParameterValue {
            locator: locator.into(),
            message: message.into(),
        }
    }

    /// The exception code surfaced to the protocol boundary.
    pub fn code(&self) -> ExceptionCode {
        match self {
            Error::Configuration(_) => ExceptionCode::NoApplicableCode,
            Error::InvalidParameterValue { .. } => ExceptionCode::InvalidParameterValue,
            Error::MissingParameterValue { .. } => ExceptionCode::MissingParameterValue,
            Error::OperationNotSupported { .. } => ExceptionCode::OperationNotSupported,
            Error::OperationParsingFailed { .. } => ExceptionCode::OperationParsingFailed,
            Error::VersionNegotiationFailed { .. } => ExceptionCode::VersionNegotiationFailed,
            Error::InvalidUpdateSequence { .. } => ExceptionCode::InvalidUpdateSequence,
            Error::DuplicateIdentifier { .. } => ExceptionCode::OperationProcessingFailed,
            Error::NotFound { .. } => ExceptionCode::NotFound,
            Error::Repository(_) | Error::Backend(_) => ExceptionCode::OperationProcessingFailed,
        }
    }

    /// Convert into the `(code, locator, message)` boundary triplet.
    pub fn to_report(&self) -> ExceptionReport {
        let locator = match self {
            Error::InvalidParameterValue { locator, .. }
            | Error::MissingParameterValue { locator }
            | Error::OperationNotSupported { locator } => Some(locator.clone()),
            Error::DuplicateIdentifier { identifier } | Error::NotFound { identifier } => {
                Some(identifier.clone())
            }
            _ => None,
        };

        ExceptionReport {
            code: self.code(),
            locator,
            message: self.to_string(),
        }
    }
}

impl From<cswd_cql::ParseError> for Error {
    fn from(e: cswd_cql::ParseError) -> Self {
        Error::OperationParsingFailed {
            message: e.to_string(),
        }
    }
}

/// Result alias used across the engine.
pub type Result<T> = std::result::Result<T, Error>;
