//! CSW protocol front end.
//!
//! The [`dispatch::Dispatcher`] negotiates service, version, and operation
//! for each inbound request and routes it to a handler; handlers call into
//! [`service::CatalogueService`], which drives the engine in `cswd-core`.
//! Request decoding and response rendering (KVP/XML/JSON) belong to the
//! embedding layer, not this crate.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod service;

pub use config::ServerConfig;
pub use dispatch::{Dispatched, Dispatcher, Operation, RequestSummary, SERVICE};
pub use error::{Error, Result};
pub use service::{
    CatalogueService, Capabilities, DomainValues, SearchRequest, SearchResults, TransactionOp,
    TransactionSummary, DEFAULT_OUTPUT_SCHEMA,
};

/// Install a `tracing` subscriber reading `RUST_LOG`, for binaries and
/// tests embedding the service. Safe to call more than once; later calls
/// are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
