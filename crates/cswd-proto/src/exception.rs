//! CSW exception codes and the boundary report triplet.

use serde::{Deserialize, Serialize};

/// The response-code taxonomy surfaced to the protocol boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExceptionCode {
    Ok,
    NotFound,
    InvalidParameterValue,
    OperationParsingFailed,
    OperationProcessingFailed,
    OperationNotSupported,
    MissingParameterValue,
    VersionNegotiationFailed,
    InvalidUpdateSequence,
    OptionNotSupported,
    NoApplicableCode,
}

impl ExceptionCode {
    /// The wire identifier used in exception reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExceptionCode::Ok => "OK",
            ExceptionCode::NotFound => "NotFound",
            ExceptionCode::InvalidParameterValue => "InvalidParameterValue",
            ExceptionCode::OperationParsingFailed => "OperationParsingFailed",
            ExceptionCode::OperationProcessingFailed => "OperationProcessingFailed",
            ExceptionCode::OperationNotSupported => "OperationNotSupported",
            ExceptionCode::MissingParameterValue => "MissingParameterValue",
            ExceptionCode::VersionNegotiationFailed => "VersionNegotiationFailed",
            ExceptionCode::InvalidUpdateSequence => "InvalidUpdateSequence",
            ExceptionCode::OptionNotSupported => "OptionNotSupported",
            ExceptionCode::NoApplicableCode => "NoApplicableCode",
        }
    }
}

impl std::fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `(code, locator, message)` triplet handed to response serializers.
///
/// `locator` names the offending parameter or token when one exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionReport {
    pub code: ExceptionCode,
    pub locator: Option<String>,
    pub message: String,
}

impl ExceptionReport {
    /// Create a report with a locator.
    pub fn new(
        code: ExceptionCode,
        locator: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            locator: Some(locator.into()),
            message: message.into(),
        }
    }

    /// Create a report without a locator.
    pub fn bare(code: ExceptionCode, message: impl Into<String>) -> Self {
        Self {
            code,
            locator: None,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ExceptionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.locator {
            Some(locator) => write!(f, "{} ({}): {}", self.code, locator, self.message),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}
