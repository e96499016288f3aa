//! The queryable registry: immutable mapping snapshots behind an atomic swap.

use super::{ElementSetName, MappingOverrides, Profile, QueryableDefinition};
use crate::error::{Error, Result};
use cswd_proto::record;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// A resolved queryable, detached from any snapshot lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQueryable {
    pub name: String,
    pub column: String,
    pub case_insensitive: bool,
}

/// One immutable mapping table. Built whole, validated, then published;
/// never edited in place.
#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    /// Lowercased typename to its queryables, keyed by lowercased logical
    /// name. Insertion order of definitions is kept separately.
    by_typename: BTreeMap<String, TypenameMappings>,
    /// Source profiles, kept so a rebuild can start from scratch.
    profiles: Vec<Profile>,
    /// Overrides currently merged over the profiles.
    overrides: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
struct TypenameMappings {
    typename: String,
    by_name: BTreeMap<String, QueryableDefinition>,
    order: Vec<String>,
}

impl MappingTable {
    /// Build a table from profiles with overrides merged on top.
    fn build(profiles: &[Profile], overrides: &BTreeMap<String, String>) -> Result<Self> {
        let mut table = MappingTable {
            profiles: profiles.to_vec(),
            overrides: overrides.clone(),
            ..Default::default()
        };

        for profile in profiles {
            if profile.typename.trim().is_empty() {
                return Err(Error::Configuration(format!(
                    "profile '{}' has an empty typename",
                    profile.name
                )));
            }
            let entry = table
                .by_typename
                .entry(profile.typename.to_ascii_lowercase())
                .or_insert_with(|| TypenameMappings {
                    typename: profile.typename.clone(),
                    ..Default::default()
                });

            for def in &profile.queryables {
                let mut def = def.clone();
                if let Some(column) = overrides.get(&def.name) {
                    def.column = column.clone();
                }
                if !record::COLUMNS.contains(&def.column.as_str()) {
                    return Err(Error::Configuration(format!(
                        "queryable '{}' maps to unknown column '{}'",
                        def.name, def.column
                    )));
                }
                let key = def.name.to_ascii_lowercase();
                match entry.by_name.get(&key) {
                    Some(existing) if existing.column != def.column => {
                        return Err(Error::Configuration(format!(
                            "queryable '{}' maps to both '{}' and '{}' for typename '{}'",
                            def.name, existing.column, def.column, profile.typename
                        )));
                    }
                    Some(_) => {}
                    None => {
                        entry.order.push(def.name.clone());
                        entry.by_name.insert(key, def);
                    }
                }
            }
        }

        // Every override must have landed on at least one definition.
        for name in overrides.keys() {
            let known = profiles
                .iter()
                .flat_map(|p| &p.queryables)
                .any(|d| d.name == *name);
            if !known {
                return Err(Error::Configuration(format!(
                    "override names unknown queryable '{name}'"
                )));
            }
        }

        Ok(table)
    }

    /// Resolve a logical name for a typename.
    ///
    /// Matching is case-insensitive. A bare name without a prefix matches
    /// the local part of a registered queryable (`title` finds `dc:title`)
    /// as long as every such match agrees on the column.
    pub fn resolve(&self, name: &str, typename: &str) -> Result<&QueryableDefinition> {
        let mappings = self.typename_mappings(typename)?;
        let key = name.to_ascii_lowercase();

        if let Some(def) = mappings.by_name.get(&key) {
            return Ok(def);
        }

        if !key.contains(':') {
            let mut hit: Option<&QueryableDefinition> = None;
            for def in mappings.by_name.values() {
                let local = def
                    .name
                    .rsplit(':')
                    .next()
                    .unwrap_or(def.name.as_str())
                    .to_ascii_lowercase();
                if local == key {
                    match hit {
                        Some(prev) if prev.column != def.column => {
                            return Err(Error::invalid_parameter(
                                name,
                                format!("ambiguous property name for typename '{typename}'"),
                            ));
                        }
                        Some(_) => {}
                        None => hit = Some(def),
                    }
                }
            }
            if let Some(def) = hit {
                return Ok(def);
            }
        }

        Err(Error::invalid_parameter(
            name,
            format!("unknown queryable for typename '{typename}'"),
        ))
    }

    /// Ordered queryables for a typename, restricted to an element set tier.
    pub fn list_queryables(
        &self,
        typename: &str,
        elementset: ElementSetName,
    ) -> Result<Vec<&QueryableDefinition>> {
        let mappings = self.typename_mappings(typename)?;
        let visible = elementset.columns();
        let mut out = Vec::new();
        for name in &mappings.order {
            if let Some(def) = mappings.by_name.get(&name.to_ascii_lowercase()) {
                if visible.contains(&def.column.as_str()) || def.column == "anytext" {
                    out.push(def);
                }
            }
        }
        Ok(out)
    }

    /// Registered typenames, in their original casing.
    pub fn typenames(&self) -> Vec<&str> {
        self.by_typename
            .values()
            .map(|m| m.typename.as_str())
            .collect()
    }

    fn typename_mappings(&self, typename: &str) -> Result<&TypenameMappings> {
        self.by_typename
            .get(&typename.to_ascii_lowercase())
            .ok_or_else(|| {
                Error::invalid_parameter("typename", format!("unknown typename '{typename}'"))
            })
    }
}

/// The process-wide queryable registry.
///
/// Reads go through an immutable [`MappingTable`] snapshot; `register` and
/// `remap` build a whole new validated table and swap the `Arc`. A failed
/// rebuild leaves the previous snapshot untouched.
pub struct QueryableRegistry {
    table: RwLock<Arc<MappingTable>>,
}

impl QueryableRegistry {
    /// An empty registry with no profiles.
    pub fn empty() -> Self {
        Self {
            table: RwLock::new(Arc::new(MappingTable::default())),
        }
    }

    /// A registry with the built-in Dublin Core and ISO profiles.
    pub fn with_core_profiles() -> Result<Self> {
        let registry = Self::empty();
        registry.register(super::csw_core_profile())?;
        registry.register(super::apiso_profile())?;
        Ok(registry)
    }

    /// Add a profile's definitions, publishing a new snapshot.
    pub fn register(&self, profile: Profile) -> Result<()> {
        let current = self.snapshot();
        let mut profiles = current.profiles.clone();
        let name = profile.name.clone();
        profiles.push(profile);
        let next = MappingTable::build(&profiles, &current.overrides)?;
        *self.table.write() = Arc::new(next);
        debug!(profile = %name, "registered queryable profile");
        Ok(())
    }

    /// Rebuild the table with overrides merged over all registered
    /// profiles and atomically replace the old snapshot.
    pub fn remap(&self, overrides: &MappingOverrides) -> Result<()> {
        let current = self.snapshot();
        let next = MappingTable::build(&current.profiles, &overrides.mappings)?;
        *self.table.write() = Arc::new(next);
        info!(count = overrides.mappings.len(), "remapped queryables");
        Ok(())
    }

    /// Resolve a logical name against the current snapshot.
    pub fn resolve(&self, name: &str, typename: &str) -> Result<ResolvedQueryable> {
        let table = self.snapshot();
        let def = table.resolve(name, typename)?;
        Ok(ResolvedQueryable {
            name: def.name.clone(),
            column: def.column.clone(),
            case_insensitive: def.case_insensitive,
        })
    }

    /// Ordered queryable definitions for a typename and element set tier.
    pub fn list_queryables(
        &self,
        typename: &str,
        elementset: ElementSetName,
    ) -> Result<Vec<QueryableDefinition>> {
        let table = self.snapshot();
        Ok(table
            .list_queryables(typename, elementset)?
            .into_iter()
            .cloned()
            .collect())
    }

    /// The current immutable snapshot. Readers hold it for as long as they
    /// need; concurrent swaps do not invalidate it.
    pub fn snapshot(&self) -> Arc<MappingTable> {
        Arc::clone(&self.table.read())
    }
}
