//! Protocol dispatch: service check, version negotiation, operation
//! lookup.
//!
//! Dispatch itself has no side effects on repository state; it only
//! selects the handler registered for the negotiated `(version,
//! operation)` pair.

use crate::error::{Error, Result};
use cswd_proto::Version;
use std::collections::HashMap;
use tracing::debug;

/// The service identifier this endpoint answers to.
pub const SERVICE: &str = "CSW";

/// The protocol operations the dispatcher knows by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetCapabilities,
    GetRecords,
    GetRecordById,
    GetDomain,
    Transaction,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::GetCapabilities => "GetCapabilities",
            Operation::GetRecords => "GetRecords",
            Operation::GetRecordById => "GetRecordById",
            Operation::GetDomain => "GetDomain",
            Operation::Transaction => "Transaction",
        }
    }

    /// Parse a request name, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "getcapabilities" => Some(Operation::GetCapabilities),
            "getrecords" => Some(Operation::GetRecords),
            "getrecordbyid" => Some(Operation::GetRecordById),
            "getdomain" => Some(Operation::GetDomain),
            "transaction" => Some(Operation::Transaction),
            _ => None,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The negotiation-relevant slice of an inbound request, extracted by the
/// outer HTTP/XML layer before dispatch.
#[derive(Debug, Clone, Default)]
pub struct RequestSummary {
    /// `service` parameter, verbatim.
    pub service: String,
    /// `version` parameter, when present.
    pub version: Option<String>,
    /// `request` parameter: the operation name.
    pub request: String,
    /// `AcceptVersions`, in client preference order. Capabilities only.
    pub accept_versions: Vec<String>,
}

/// A successful dispatch: the negotiated pair plus its handler.
#[derive(Debug)]
pub struct Dispatched<'a, H> {
    pub version: Version,
    pub operation: Operation,
    pub handler: &'a H,
}

/// Routes requests to handlers registered per `(version, operation)`.
pub struct Dispatcher<H> {
    handlers: HashMap<(Version, Operation), H>,
    /// Supported versions, newest first.
    versions: Vec<Version>,
}

impl<H> Dispatcher<H> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            versions: Vec::new(),
        }
    }

    /// Register a handler for one `(version, operation)` pair. Replaces
    /// any previous registration for the pair.
    pub fn register(&mut self, version: Version, operation: Operation, handler: H) {
        self.handlers.insert((version, operation), handler);
        if !self.versions.contains(&version) {
            self.versions.push(version);
            self.versions.sort();
            self.versions.reverse();
        }
    }

    /// Supported versions, newest first.
    pub fn supported_versions(&self) -> &[Version] {
        &self.versions
    }

    /// Negotiate and route one request.
    pub fn dispatch(&self, request: &RequestSummary) -> Result<Dispatched<'_, H>> {
        if !request.service.eq_ignore_ascii_case(SERVICE) {
            return Err(Error::ServiceMismatch {
                service: request.service.clone(),
            });
        }

        let operation = Operation::parse(&request.request).ok_or_else(|| {
            cswd_core::Error::OperationNotSupported {
                locator: request.request.clone(),
            }
        })?;

        let version = match operation {
            Operation::GetCapabilities => self.negotiate(&request.accept_versions)?,
            _ => self.exact_version(request.version.as_deref())?,
        };

        let handler = self.handlers.get(&(version, operation)).ok_or_else(|| {
            cswd_core::Error::OperationNotSupported {
                locator: operation.as_str().to_string(),
            }
        })?;

        debug!(%version, operation = %operation, "dispatched request");
        Ok(Dispatched {
            version,
            operation,
            handler,
        })
    }

    /// Capabilities negotiation: first client-preferred version the server
    /// supports. No client preference at all means the newest supported
    /// version.
    fn negotiate(&self, accept_versions: &[String]) -> Result<Version> {
        if accept_versions.is_empty() {
            return self.versions.first().copied().ok_or_else(|| {
                cswd_core::Error::VersionNegotiationFailed {
                    message: "no versions are registered".to_string(),
                }
                .into()
            });
        }
        for candidate in accept_versions {
            if let Some(version) = Version::parse(candidate) {
                if self.versions.contains(&version) {
                    return Ok(version);
                }
            }
        }
        Err(cswd_core::Error::VersionNegotiationFailed {
            message: format!(
                "none of the client versions [{}] are supported",
                accept_versions.join(", ")
            ),
        }
        .into())
    }

    /// Non-capabilities operations need an explicit, exactly supported
    /// version.
    fn exact_version(&self, version: Option<&str>) -> Result<Version> {
        let raw = version.ok_or(cswd_core::Error::MissingParameterValue {
            locator: "version".to_string(),
        })?;
        let parsed = Version::parse(raw).ok_or_else(|| {
            cswd_core::Error::invalid_parameter("version", format!("unknown version '{raw}'"))
        })?;
        if !self.versions.contains(&parsed) {
            return Err(cswd_core::Error::invalid_parameter(
                "version",
                format!("version '{raw}' is not supported"),
            )
            .into());
        }
        Ok(parsed)
    }
}

impl<H> Default for Dispatcher<H> {
    fn default() -> Self {
        Self::new()
    }
}
