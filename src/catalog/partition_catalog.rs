//! SmartKG partition catalog ("SmartKG index").
//!
//! The catalog is a JSON document published per source:
//!
//! ```json
//! {
//!   "families": [
//!     { "name": "f1", "predicateSet": ["http://ex.org/p1", "http://ex.org/p2"],
//!       "grouped": true, "originalFamily": false }
//!   ],
//!   "infrequentPredicates": ["http://ex.org/p9"]
//! }
//! ```
//!
//! Predicates are plain IRIs. After parsing, predicate arrays are turned into
//! hash sets so membership tests during routing are O(1).

use crate::cache::ObjectCache;
use crate::core::QueryContext;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCatalog {
    families: Vec<RawFamily>,
    infrequent_predicates: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFamily {
    name: String,
    predicate_set: Vec<String>,
    #[serde(default)]
    grouped: bool,
    #[serde(default)]
    original_family: bool,
}

/// A precomputed partition holding exactly the triples whose predicate is in
/// `predicate_set`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Family {
    pub name: String,
    pub predicate_set: HashSet<String>,
    /// Optimized for multi-predicate (star) access
    pub grouped: bool,
    /// The trivial partition equal to the whole dataset
    pub original: bool,
}

impl Family {
    pub fn new<I, S>(name: impl Into<String>, predicates: I, grouped: bool, original: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            predicate_set: predicates.into_iter().map(Into::into).collect(),
            grouped,
            original,
        }
    }

    /// Whether this family contains at least all the given predicates.
    pub fn covers<S: AsRef<str>>(&self, predicates: &[S]) -> bool {
        predicates.iter().all(|p| self.predicate_set.contains(p.as_ref()))
    }

    /// Number of distinct predicates in the family.
    pub fn cardinality(&self) -> usize {
        self.predicate_set.len()
    }
}

/// Families and infrequent predicates of one source, built fresh per BGP evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionCatalog {
    pub families: Vec<Family>,
    pub infrequent_predicates: HashSet<String>,
}

impl PartitionCatalog {
    pub fn new<I, S>(families: Vec<Family>, infrequent_predicates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            families,
            infrequent_predicates: infrequent_predicates.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses a raw catalog payload fetched from `uri`.
    pub fn from_json(uri: &str, payload: &[u8]) -> Result<Self> {
        let raw: RawCatalog = serde_json::from_slice(payload)
            .map_err(|source| Error::CatalogParse { uri: uri.to_string(), source })?;

        let families = raw
            .families
            .into_iter()
            .map(|family| {
                Family::new(
                    family.name,
                    family.predicate_set,
                    family.grouped,
                    family.original_family,
                )
            })
            .collect();

        Ok(Self::new(families, raw.infrequent_predicates))
    }

    pub fn is_infrequent(&self, predicate: &str) -> bool {
        self.infrequent_predicates.contains(predicate)
    }
}

/// Loads the partition catalog at `index_uri` through the object cache.
///
/// Parse errors are not retried; they abort the query.
pub async fn load_catalog(
    cache: &ObjectCache,
    index_uri: &str,
    context: &QueryContext,
) -> Result<PartitionCatalog> {
    let payload = cache.fetch_bytes(index_uri, context).await?;
    let catalog = PartitionCatalog::from_json(index_uri, &payload)?;
    debug!(
        "Loaded SmartKG index {} with {} families and {} infrequent predicates",
        index_uri,
        catalog.families.len(),
        catalog.infrequent_predicates.len()
    );
    Ok(catalog)
}
