//! The canonical metadata record.
//!
//! A [`Record`] is produced by an external metadata parser (or a
//! Transaction-Insert) in fully normalized form. Fields are stored under
//! stable physical column names; logical queryable names (`csw:Title`,
//! `apiso:Abstract`, ...) map onto these columns through the queryable
//! registry, never directly here.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// All physical columns of the record store, in table order.
///
/// The first five are the identity/bookkeeping columns; everything after
/// `anytext` is a semantic field addressable through queryable mappings.
pub const COLUMNS: &[&str] = &[
    "identifier",
    "typename",
    "schema",
    "mdsource",
    "insert_date",
    "anytext",
    "language",
    "title",
    "abstract",
    "keywords",
    "format",
    "source",
    "date",
    "date_modified",
    "type",
    "crs",
    "creator",
    "publisher",
    "contributor",
    "organization",
    "relation",
    "parentidentifier",
    "accessconstraints",
    "otherconstraints",
    "temporal_begin",
    "temporal_end",
    "servicetype",
    "servicetypeversion",
    "operateson",
    "links",
    "wkt_geometry",
];

/// A normalized catalogue record.
///
/// `identifier` is unique and immutable once set; `insert_date` is fixed at
/// creation and feeds the capabilities updateSequence.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    pub identifier: String,
    pub typename: String,
    pub schema: String,
    pub mdsource: String,
    pub insert_date: String,
    /// Full-text blob over all textual fields, matched by `csw:AnyText`.
    pub anytext: String,
    pub language: Option<String>,
    pub title: Option<String>,
    pub abstract_: Option<String>,
    pub keywords: Option<String>,
    pub format: Option<String>,
    pub source: Option<String>,
    pub date: Option<String>,
    pub date_modified: Option<String>,
    pub type_: Option<String>,
    pub crs: Option<String>,
    pub creator: Option<String>,
    pub publisher: Option<String>,
    pub contributor: Option<String>,
    pub organization: Option<String>,
    pub relation: Option<String>,
    pub parentidentifier: Option<String>,
    pub accessconstraints: Option<String>,
    pub otherconstraints: Option<String>,
    pub temporal_begin: Option<String>,
    pub temporal_end: Option<String>,
    pub servicetype: Option<String>,
    pub servicetypeversion: Option<String>,
    pub operateson: Option<String>,
    /// Newline-separated link tuples, opaque to the engine.
    pub links: Option<String>,
    /// Bounding geometry as WKT (polygon or envelope).
    pub wkt_geometry: Option<String>,
}

impl Record {
    /// Create a record with identity columns set and `insert_date` stamped.
    pub fn new(
        identifier: impl Into<String>,
        typename: impl Into<String>,
        schema: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            typename: typename.into(),
            schema: schema.into(),
            mdsource: "local".to_string(),
            insert_date: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            ..Default::default()
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the abstract.
    pub fn with_abstract(mut self, text: impl Into<String>) -> Self {
        self.abstract_ = Some(text.into());
        self
    }

    /// Set the comma-separated keyword list.
    pub fn with_keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = Some(keywords.into());
        self
    }

    /// Set the bounding geometry as WKT.
    pub fn with_geometry(mut self, wkt: impl Into<String>) -> Self {
        self.wkt_geometry = Some(wkt.into());
        self
    }

    /// Set the parent identifier.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parentidentifier = Some(parent.into());
        self
    }

    /// Set an arbitrary column by physical name. Unknown columns are ignored.
    pub fn with_field(mut self, column: &str, value: impl Into<String>) -> Self {
        self.set(column, Some(value.into()));
        self
    }

    /// Read a column by physical name.
    pub fn get(&self, column: &str) -> Option<&str> {
        match column {
            "identifier" => Some(&self.identifier),
            "typename" => Some(&self.typename),
            "schema" => Some(&self.schema),
            "mdsource" => Some(&self.mdsource),
            "insert_date" => Some(&self.insert_date),
            "anytext" => Some(&self.anytext),
            "language" => self.language.as_deref(),
            "title" => self.title.as_deref(),
            "abstract" => self.abstract_.as_deref(),
            "keywords" => self.keywords.as_deref(),
            "format" => self.format.as_deref(),
            "source" => self.source.as_deref(),
            "date" => self.date.as_deref(),
            "date_modified" => self.date_modified.as_deref(),
            "type" => self.type_.as_deref(),
            "crs" => self.crs.as_deref(),
            "creator" => self.creator.as_deref(),
            "publisher" => self.publisher.as_deref(),
            "contributor" => self.contributor.as_deref(),
            "organization" => self.organization.as_deref(),
            "relation" => self.relation.as_deref(),
            "parentidentifier" => self.parentidentifier.as_deref(),
            "accessconstraints" => self.accessconstraints.as_deref(),
            "otherconstraints" => self.otherconstraints.as_deref(),
            "temporal_begin" => self.temporal_begin.as_deref(),
            "temporal_end" => self.temporal_end.as_deref(),
            "servicetype" => self.servicetype.as_deref(),
            "servicetypeversion" => self.servicetypeversion.as_deref(),
            "operateson" => self.operateson.as_deref(),
            "links" => self.links.as_deref(),
            "wkt_geometry" => self.wkt_geometry.as_deref(),
            _ => None,
        }
    }

    /// Write a column by physical name. Identity columns take the value
    /// as-is (callers enforce immutability rules); unknown columns are a
    /// no-op.
    pub fn set(&mut self, column: &str, value: Option<String>) {
        match column {
            "identifier" => self.identifier = value.unwrap_or_default(),
            "typename" => self.typename = value.unwrap_or_default(),
            "schema" => self.schema = value.unwrap_or_default(),
            "mdsource" => self.mdsource = value.unwrap_or_default(),
            "insert_date" => self.insert_date = value.unwrap_or_default(),
            "anytext" => self.anytext = value.unwrap_or_default(),
            "language" => self.language = value,
            "title" => self.title = value,
            "abstract" => self.abstract_ = value,
            "keywords" => self.keywords = value,
            "format" => self.format = value,
            "source" => self.source = value,
            "date" => self.date = value,
            "date_modified" => self.date_modified = value,
            "type" => self.type_ = value,
            "crs" => self.crs = value,
            "creator" => self.creator = value,
            "publisher" => self.publisher = value,
            "contributor" => self.contributor = value,
            "organization" => self.organization = value,
            "relation" => self.relation = value,
            "parentidentifier" => self.parentidentifier = value,
            "accessconstraints" => self.accessconstraints = value,
            "otherconstraints" => self.otherconstraints = value,
            "temporal_begin" => self.temporal_begin = value,
            "temporal_end" => self.temporal_end = value,
            "servicetype" => self.servicetype = value,
            "servicetypeversion" => self.servicetypeversion = value,
            "operateson" => self.operateson = value,
            "links" => self.links = value,
            "wkt_geometry" => self.wkt_geometry = value,
            _ => {}
        }
    }

    /// Rebuild the `anytext` blob from the textual fields.
    ///
    /// External parsers normally supply this; Transaction-Insert callers can
    /// use it when they build records by hand.
    pub fn rebuild_anytext(&mut self) {
        let mut parts: Vec<&str> = Vec::new();
        for column in [
            "title",
            "abstract",
            "keywords",
            "creator",
            "publisher",
            "contributor",
            "organization",
            "format",
            "source",
        ] {
            if let Some(value) = self.get(column) {
                if !value.is_empty() {
                    parts.push(value);
                }
            }
        }
        self.anytext = parts.join(" ");
    }
}
