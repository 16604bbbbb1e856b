//! Family Selector
//!
//! Chooses the partition families a star is evaluated over. Selection is a
//! cascade of filters over the catalog's families, using only the structural
//! hints the catalog declares:
//!
//! 1. keep the families covering every predicate of the star
//! 2. if any of those is grouped, keep only the grouped ones with the smallest
//!    predicate set (ties keep all); otherwise keep every covering family, as
//!    each one holds different subjects
//! 3. decline when more than `max_families` remain
//! 4. decline when the original (whole dataset) family remains
//!
//! A decline is not an error: the star is evaluated through the fragment
//! interface instead.

use crate::cache::ObjectCache;
use crate::catalog::{Family, PartitionCatalog};
use crate::config::RouterConfig;
use crate::core::{Bgp, DataSource, QueryContext};
use crate::error::Result;
use crate::routing::star_decomposer::Star;
use futures_util::future::{try_join, try_join_all};
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

/// Suffix of the auxiliary HDT index file published next to each partition file.
pub const HDT_INDEX_SUFFIX: &str = ".index.v1-1";

/// Why a star that was eligible for routing still goes to the fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DeclineReason {
    NoCoveringFamily,
    TooManyFamilies { count: usize, max: usize },
    OriginalFamily { family: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<'a> {
    Routed(Vec<&'a Family>),
    Declined(DeclineReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilySelector {
    pub max_families: usize,
    pub fetch_index_files: bool,
}

impl FamilySelector {
    pub fn new(max_families: usize, fetch_index_files: bool) -> Self {
        Self { max_families, fetch_index_files }
    }

    pub fn from_config(config: &RouterConfig) -> Self {
        Self::new(config.max_families, config.fetch_hdt_index_files)
    }

    /// Runs the selection cascade for a star needing `predicates`.
    pub fn select<'a, S: AsRef<str>>(
        &self,
        predicates: &[S],
        catalog: &'a PartitionCatalog,
    ) -> Selection<'a> {
        let mut families: Vec<&Family> =
            catalog.families.iter().filter(|family| family.covers(predicates)).collect();
        debug!("Found {} SmartKG families", families.len());

        if families.is_empty() {
            return Selection::Declined(DeclineReason::NoCoveringFamily);
        }

        if families.iter().any(|family| family.grouped) {
            families.retain(|family| family.grouped);
            // Non-empty here, so the minimum exists.
            let min = families.iter().map(|family| family.cardinality()).min().unwrap_or_default();
            families.retain(|family| family.cardinality() == min);
        }
        debug!("Filtered down to {} SmartKG families", families.len());

        if families.len() > self.max_families {
            debug!(
                "Skipping SmartKG handling because number of families is above the threshold ({})",
                self.max_families
            );
            return Selection::Declined(DeclineReason::TooManyFamilies {
                count: families.len(),
                max: self.max_families,
            });
        }

        if let Some(original) = families.iter().find(|family| family.original) {
            debug!("Skipping SmartKG handling because we found an original family");
            return Selection::Declined(DeclineReason::OriginalFamily {
                family: original.name.clone(),
            });
        }

        Selection::Routed(families)
    }

    /// Downloads the partition file of every family concurrently and returns one
    /// local source per family, in the order of `families`.
    pub async fn fetch_families(
        &self,
        families: &[&Family],
        index_uri: &str,
        cache: &ObjectCache,
        context: &QueryContext,
    ) -> Result<Vec<DataSource>> {
        let paths = try_join_all(
            families.iter().map(|family| self.fetch_family(family, index_uri, cache, context)),
        )
        .await?;
        Ok(paths.into_iter().map(DataSource::hdt_file).collect())
    }

    async fn fetch_family(
        &self,
        family: &Family,
        index_uri: &str,
        cache: &ObjectCache,
        context: &QueryContext,
    ) -> Result<PathBuf> {
        let file_uri = family_uri(index_uri, &family.name);
        if self.fetch_index_files {
            let index_file_uri = format!("{}{}", file_uri, HDT_INDEX_SUFFIX);
            let (path, _) = try_join(
                cache.fetch_location(&file_uri, context),
                cache.fetch_location(&index_file_uri, context),
            )
            .await?;
            Ok(path)
        } else {
            cache.fetch_location(&file_uri, context).await
        }
    }
}

/// URI of a family's partition file, relative to the partition index URI.
pub fn family_uri(index_uri: &str, name: &str) -> String {
    format!("{}/{}", index_uri, name)
}

/// Distinct predicate IRIs of a star, in first-seen order.
///
/// Variable predicates are skipped; eligible stars have none.
pub fn star_predicates(star: &Star, bgp: &Bgp) -> Vec<String> {
    let mut predicates: Vec<String> = Vec::new();
    for pattern in star.positions.iter().filter_map(|&i| bgp.patterns().get(i)) {
        if let Some(predicate) = pattern.predicate_iri() {
            if !predicates.iter().any(|p| p == predicate) {
                predicates.push(predicate.to_string());
            }
        }
    }
    predicates
}

#[cfg(test)]
mod tests {
    use super::*;

    const P1: &str = "http://ex.org/p1";
    const P2: &str = "http://ex.org/p2";
    const P3: &str = "http://ex.org/p3";

    fn names(selection: &Selection<'_>) -> Vec<String> {
        match selection {
            Selection::Routed(families) => families.iter().map(|f| f.name.clone()).collect(),
            Selection::Declined(reason) => panic!("unexpected decline: {:?}", reason),
        }
    }

    #[test]
    fn test_no_covering_family_declines() {
        let catalog = PartitionCatalog::new(vec![Family::new("f1", [P1], true, false)], Vec::<String>::new());
        let selection = FamilySelector::new(5, false).select(&[P1, P2], &catalog);
        assert_eq!(selection, Selection::Declined(DeclineReason::NoCoveringFamily));
    }

    #[test]
    fn test_grouped_beats_smaller_ungrouped() {
        let catalog = PartitionCatalog::new(
            vec![
                Family::new("plain", [P1, P2], false, false),
                Family::new("grouped", [P1, P2, P3], true, false),
            ],
            Vec::<String>::new(),
        );
        let selection = FamilySelector::new(5, false).select(&[P1, P2], &catalog);
        assert_eq!(names(&selection), vec!["grouped"]);
    }

    #[test]
    fn test_minimal_cardinality_keeps_ties() {
        let catalog = PartitionCatalog::new(
            vec![
                Family::new("f12", [P1, P2], true, false),
                Family::new("f123", [P1, P2, P3], true, false),
                Family::new("f12b", [P1, P2], true, false),
            ],
            Vec::<String>::new(),
        );
        let selection = FamilySelector::new(5, false).select(&[P1, P2], &catalog);
        assert_eq!(names(&selection), vec!["f12", "f12b"]);
    }

    #[test]
    fn test_ungrouped_covering_families_are_all_kept() {
        let catalog = PartitionCatalog::new(
            vec![
                Family::new("f12", [P1, P2], false, false),
                Family::new("f123", [P1, P2, P3], false, false),
                Family::new("f3", [P3], false, false),
            ],
            Vec::<String>::new(),
        );
        let selection = FamilySelector::new(5, false).select(&[P1, P2], &catalog);
        assert_eq!(names(&selection), vec!["f12", "f123"]);
    }

    #[test]
    fn test_threshold_declines() {
        let catalog = PartitionCatalog::new(
            vec![Family::new("a", [P1, P2], true, false), Family::new("b", [P1, P2], true, false)],
            Vec::<String>::new(),
        );
        assert_eq!(
            FamilySelector::new(1, false).select(&[P1, P2], &catalog),
            Selection::Declined(DeclineReason::TooManyFamilies { count: 2, max: 1 })
        );
        assert_eq!(names(&FamilySelector::new(2, false).select(&[P1, P2], &catalog)).len(), 2);
    }

    #[test]
    fn test_original_family_declines() {
        let catalog = PartitionCatalog::new(
            vec![Family::new("all", [P1, P2, P3], false, true)],
            Vec::<String>::new(),
        );
        assert_eq!(
            FamilySelector::new(5, false).select(&[P1, P2], &catalog),
            Selection::Declined(DeclineReason::OriginalFamily { family: "all".to_string() })
        );
    }

    #[test]
    fn test_selection_is_idempotent() {
        let catalog = PartitionCatalog::new(
            vec![Family::new("f1", [P1, P2], true, false), Family::new("f2", [P1, P2, P3], false, false)],
            Vec::<String>::new(),
        );
        let selector = FamilySelector::new(5, false);
        assert_eq!(selector.select(&[P1, P2], &catalog), selector.select(&[P1, P2], &catalog));
    }

    #[test]
    fn test_family_uri() {
        assert_eq!(
            family_uri("http://quantum.ex.org/molecule/watdiv", "f1"),
            "http://quantum.ex.org/molecule/watdiv/f1"
        );
    }
}
