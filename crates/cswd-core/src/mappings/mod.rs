//! Queryable mapping definitions and profiles.
//!
//! A *queryable* is a logical property name a client may reference in a
//! constraint (`dc:title`, `apiso:AnyText`). Each maps to one physical
//! column of the record store. Profiles group queryables by the record
//! typename they apply to; deployments can override the column side of
//! any mapping through [`MappingOverrides`] without touching code.

mod registry;

pub use registry::{MappingTable, QueryableRegistry, ResolvedQueryable};

use crate::error::{Error, Result};
use cswd_proto::record;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Element set tiers controlling which columns a search result carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ElementSetName {
    /// Identifier, title, type, and bounding geometry.
    Brief,
    /// Brief plus abstract, keywords, format, modification date, CRS, links.
    #[default]
    Summary,
    /// Every stored column.
    Full,
}

impl ElementSetName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementSetName::Brief => "brief",
            ElementSetName::Summary => "summary",
            ElementSetName::Full => "full",
        }
    }

    /// Parse a client-supplied element set name (case-insensitive).
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "brief" => Ok(ElementSetName::Brief),
            "summary" => Ok(ElementSetName::Summary),
            "full" => Ok(ElementSetName::Full),
            other => Err(Error::invalid_parameter(
                "elementsetname",
                format!("unknown element set '{other}'"),
            )),
        }
    }

    /// The physical columns this tier projects.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            ElementSetName::Brief => &["identifier", "typename", "title", "type", "wkt_geometry"],
            ElementSetName::Summary => &[
                "identifier",
                "typename",
                "title",
                "type",
                "abstract",
                "keywords",
                "format",
                "date_modified",
                "crs",
                "links",
                "wkt_geometry",
            ],
            ElementSetName::Full => record::COLUMNS,
        }
    }
}

impl std::fmt::Display for ElementSetName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logical-to-physical property mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryableDefinition {
    /// Logical name, prefix included (`dc:title`).
    pub name: String,
    /// Physical column in the record store.
    pub column: String,
    /// Free-text properties compare case-insensitively.
    pub case_insensitive: bool,
}

impl QueryableDefinition {
    pub fn new(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
            case_insensitive: false,
        }
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }
}

/// A named set of queryables bound to one record typename.
#[derive(Debug, Clone)]
pub struct Profile {
    pub name: String,
    pub typename: String,
    pub queryables: Vec<QueryableDefinition>,
}

impl Profile {
    pub fn new(name: impl Into<String>, typename: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            typename: typename.into(),
            queryables: Vec::new(),
        }
    }

    pub fn with_queryable(mut self, def: QueryableDefinition) -> Self {
        self.queryables.push(def);
        self
    }
}

/// Dublin Core queryables for the `csw:Record` typename.
pub fn csw_core_profile() -> Profile {
    let mut profile = Profile::new("csw", "csw:Record");
    let defs = [
        ("dc:identifier", "identifier", false),
        ("dc:title", "title", true),
        ("dc:creator", "creator", true),
        ("dc:subject", "keywords", true),
        ("dct:abstract", "abstract", true),
        ("dc:publisher", "publisher", true),
        ("dc:contributor", "contributor", true),
        ("dct:modified", "date_modified", false),
        ("dc:date", "date", false),
        ("dc:type", "type", false),
        ("dc:format", "format", false),
        ("dc:source", "source", false),
        ("dc:language", "language", false),
        ("dc:relation", "relation", false),
        ("dc:rights", "accessconstraints", true),
        ("csw:AnyText", "anytext", true),
        ("ows:BoundingBox", "wkt_geometry", false),
    ];
    for (name, column, ci) in defs {
        let mut def = QueryableDefinition::new(name, column);
        if ci {
            def = def.case_insensitive();
        }
        profile = profile.with_queryable(def);
    }
    profile
}

/// ISO metadata queryables for the `gmd:MD_Metadata` typename.
pub fn apiso_profile() -> Profile {
    let mut profile = Profile::new("apiso", "gmd:MD_Metadata");
    let defs = [
        ("apiso:Identifier", "identifier", false),
        ("apiso:Title", "title", true),
        ("apiso:Abstract", "abstract", true),
        ("apiso:Subject", "keywords", true),
        ("apiso:Modified", "date_modified", false),
        ("apiso:Type", "type", false),
        ("apiso:Format", "format", false),
        ("apiso:Language", "language", false),
        ("apiso:CRS", "crs", false),
        ("apiso:AnyText", "anytext", true),
        ("apiso:BoundingBox", "wkt_geometry", false),
        ("apiso:TempExtent_begin", "temporal_begin", false),
        ("apiso:TempExtent_end", "temporal_end", false),
        ("apiso:ParentIdentifier", "parentidentifier", false),
        ("apiso:Creator", "creator", true),
        ("apiso:Publisher", "publisher", true),
        ("apiso:Contributor", "contributor", true),
        ("apiso:OrganisationName", "organization", true),
        ("apiso:ServiceType", "servicetype", false),
        ("apiso:ServiceTypeVersion", "servicetypeversion", false),
        ("apiso:OperatesOn", "operateson", false),
        ("apiso:AccessConstraints", "accessconstraints", true),
    ];
    for (name, column, ci) in defs {
        let mut def = QueryableDefinition::new(name, column);
        if ci {
            def = def.case_insensitive();
        }
        profile = profile.with_queryable(def);
    }
    profile
}

/// Deployment overrides: logical queryable name to replacement column.
///
/// Loaded from JSON:
///
/// ```json
/// { "mappings": { "dc:rights": "otherconstraints" } }
/// ```
///
/// Override targets must name columns of the physical schema; `remap`
/// rejects the whole document otherwise.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MappingOverrides {
    pub mappings: BTreeMap<String, String>,
}

impl MappingOverrides {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::Configuration(format!("bad mapping overrides: {e}")))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Configuration(format!(
                "cannot read {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_set_parse() {
        assert_eq!(ElementSetName::parse("Full").unwrap(), ElementSetName::Full);
        assert_eq!(
            ElementSetName::parse("BRIEF").unwrap(),
            ElementSetName::Brief
        );
        assert!(ElementSetName::parse("everything").is_err());
    }

    #[test]
    fn test_element_set_columns_are_real() {
        for set in [
            ElementSetName::Brief,
            ElementSetName::Summary,
            ElementSetName::Full,
        ] {
            for col in set.columns() {
                assert!(record::COLUMNS.contains(col), "unknown column {col}");
            }
        }
        assert_eq!(ElementSetName::Full.columns().len(), record::COLUMNS.len());
    }

    #[test]
    fn test_core_profiles_map_real_columns() {
        for profile in [csw_core_profile(), apiso_profile()] {
            for def in &profile.queryables {
                assert!(
                    record::COLUMNS.contains(&def.column.as_str()),
                    "{} maps to unknown column {}",
                    def.name,
                    def.column
                );
            }
        }
    }

    #[test]
    fn test_overrides_from_json() {
        let overrides =
            MappingOverrides::from_json(r#"{ "mappings": { "dc:rights": "otherconstraints" } }"#)
                .unwrap();
        assert_eq!(
            overrides.mappings.get("dc:rights").map(String::as_str),
            Some("otherconstraints")
        );
        assert!(MappingOverrides::from_json("not json").is_err());
    }
}
