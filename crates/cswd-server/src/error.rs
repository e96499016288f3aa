//! Server-side error type, layered over the engine taxonomy.

use cswd_proto::{ExceptionCode, ExceptionReport};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The request named a service this endpoint does not provide.
    #[error("service '{service}' is not provided by this endpoint")]
    ServiceMismatch { service: String },

    /// Engine error, mapped straight through to its exception code.
    #[error(transparent)]
    Core(#[from] cswd_core::Error),
}

impl Error {
    pub fn code(&self) -> ExceptionCode {
        match self {
            Error::ServiceMismatch { .. } => ExceptionCode::NoApplicableCode,
            Error::Core(e) => e.code(),
        }
    }

    /// The `(code, locator, message)` triplet serializers render.
    pub fn to_report(&self) -> ExceptionReport {
        match self {
            Error::ServiceMismatch { .. } => ExceptionReport {
                code: ExceptionCode::NoApplicableCode,
                locator: Some("service".to_string()),
                message: self.to_string(),
            },
            Error::Core(e) => e.to_report(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_mismatch_report() {
        let err = Error::ServiceMismatch {
            service: "WMS".to_string(),
        };
        let report = err.to_report();
        assert_eq!(report.code, ExceptionCode::NoApplicableCode);
        assert_eq!(report.locator.as_deref(), Some("service"));
    }

    #[test]
    fn test_core_errors_pass_through() {
        let err: Error = cswd_core::Error::MissingParameterValue {
            locator: "version".to_string(),
        }
        .into();
        assert_eq!(err.code(), ExceptionCode::MissingParameterValue);
    }
}
