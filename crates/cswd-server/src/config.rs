//! Server configuration.

use crate::error::{Error, Result};
use crate::service::CatalogueService;
use cswd_core::{MappingOverrides, QueryableRegistry, Repository, RepositoryFilter};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Default page size when a request names none.
pub const DEFAULT_MAX_RECORDS: u32 = 10;

/// Catalogue server configuration.
///
/// Loadable from JSON:
///
/// ```json
/// {
///     "database_path": "/var/lib/cswd/catalogue.db",
///     "mappings_path": "/etc/cswd/mappings.json",
///     "repository_filter": "type = 'dataset'",
///     "max_records": 25
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Path to the SQLite record store.
    pub database_path: PathBuf,

    /// Optional mapping-overrides document applied at startup.
    #[serde(default)]
    pub mappings_path: Option<PathBuf>,

    /// Optional operator predicate ANDed onto every query.
    #[serde(default)]
    pub repository_filter: Option<String>,

    /// Default page size.
    #[serde(default = "default_max_records")]
    pub max_records: u32,
}

fn default_max_records() -> u32 {
    DEFAULT_MAX_RECORDS
}

impl ServerConfig {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            mappings_path: None,
            repository_filter: None,
            max_records: DEFAULT_MAX_RECORDS,
        }
    }

    pub fn with_mappings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.mappings_path = Some(path.into());
        self
    }

    pub fn with_repository_filter(mut self, predicate: impl Into<String>) -> Self {
        self.repository_filter = Some(predicate.into());
        self
    }

    pub fn with_max_records(mut self, max_records: u32) -> Self {
        self.max_records = max_records;
        self
    }

    /// Load a configuration document from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Core(cswd_core::Error::Configuration(format!(
                "cannot read {}: {e}",
                path.as_ref().display()
            )))
        })?;
        let config: ServerConfig = serde_json::from_str(&text).map_err(|e| {
            Error::Core(cswd_core::Error::Configuration(format!(
                "bad configuration: {e}"
            )))
        })?;
        Ok(config)
    }

    /// Build the full service stack this configuration describes:
    /// registry with core profiles (plus overrides), repository, service.
    pub fn open_service(&self) -> Result<CatalogueService> {
        let registry = Arc::new(QueryableRegistry::with_core_profiles()?);
        if let Some(path) = &self.mappings_path {
            let overrides = MappingOverrides::from_path(path)?;
            registry.remap(&overrides)?;
        }

        let mut repo = Repository::open(&self.database_path, Arc::clone(&registry))?;
        if let Some(predicate) = &self.repository_filter {
            repo = repo.with_filter(RepositoryFilter::new(predicate.clone())?);
        }

        info!(path = %self.database_path.display(), "catalogue service ready");
        Ok(CatalogueService::new(Arc::new(repo), registry))
    }
}
