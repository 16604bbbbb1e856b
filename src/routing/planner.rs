//! Routing plan: the shared pipeline in front of both execution strategies.
//!
//! For one BGP the planner decomposes the patterns into stars, classifies each
//! star, runs family selection on the eligible ones and downloads the chosen
//! partition files. The result is a [`RoutingPlan`] in which every pattern
//! position of the BGP appears exactly once, either in a routed star or in the
//! fallback list.

use crate::cache::ObjectCache;
use crate::catalog::{load_catalog, Family, PartitionCatalog};
use crate::config::RouterConfig;
use crate::core::{Bgp, DataSource, QueryContext};
use crate::error::{Error, Result};
use crate::routing::eligibility::{classify, Ineligible};
use crate::routing::family_selector::{star_predicates, DeclineReason, FamilySelector, Selection};
use crate::routing::source_resolver::SourceResolver;
use crate::routing::star_decomposer::{decompose, Star};
use futures_util::future::try_join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Why a star is evaluated through the fragment interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FallbackReason {
    Ineligible(Ineligible),
    Declined(DeclineReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Route {
    Routed { families: Vec<String> },
    Fallback(FallbackReason),
}

/// Routing decision for one star, as reported by [`RoutingPlanner::plan_decisions`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StarDecision {
    pub subject: String,
    pub predicates: Vec<String>,
    pub positions: Vec<usize>,
    #[serde(flatten)]
    pub route: Route,
}

/// A star together with the local sources it is evaluated over.
#[derive(Debug, Clone)]
pub struct RoutedStar {
    pub star: Star,
    pub sources: Vec<DataSource>,
}

#[derive(Debug, Clone, Default)]
pub struct RoutingPlan {
    pub routed: Vec<RoutedStar>,
    /// Positions of the patterns evaluated through the fragment interface:
    /// ineligible stars first, then declined stars, each in star order.
    pub fallback: Vec<usize>,
}

impl RoutingPlan {
    pub fn fallback_bgp(&self, bgp: &Bgp) -> Bgp {
        bgp.select(&self.fallback)
    }

    /// Number of pattern positions covered by the plan.
    pub fn len(&self) -> usize {
        self.fallback.len() + self.routed.iter().map(|routed| routed.star.len()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

enum Decision<'a> {
    Route(Vec<&'a Family>),
    Ineligible(Ineligible),
    Declined(DeclineReason),
}

/// Source resolution, catalog loading and per-star routing decisions.
pub struct RoutingPlanner {
    cache: Arc<ObjectCache>,
    resolver: SourceResolver,
    selector: FamilySelector,
}

impl RoutingPlanner {
    pub fn new(config: &RouterConfig, cache: Arc<ObjectCache>) -> Result<Self> {
        Ok(Self {
            cache,
            resolver: SourceResolver::new(&config.source_rule)?,
            selector: FamilySelector::from_config(config),
        })
    }

    pub fn cache(&self) -> &Arc<ObjectCache> {
        &self.cache
    }

    /// Partition index URI of the context's single source, if it has one.
    pub fn index_uri(&self, context: &QueryContext) -> Option<String> {
        self.resolver.index_uri_for(context)
    }

    pub async fn load_catalog(
        &self,
        index_uri: &str,
        context: &QueryContext,
    ) -> Result<PartitionCatalog> {
        load_catalog(&self.cache, index_uri, context).await
    }

    fn decide<'a>(&self, bgp: &Bgp, catalog: &'a PartitionCatalog) -> Vec<(Star, Decision<'a>)> {
        decompose(bgp)
            .into_iter()
            .map(|star| {
                let decision = match classify(&star, bgp, catalog) {
                    Err(reason) => Decision::Ineligible(reason),
                    Ok(()) => match self.selector.select(&star_predicates(&star, bgp), catalog) {
                        Selection::Routed(families) => Decision::Route(families),
                        Selection::Declined(reason) => Decision::Declined(reason),
                    },
                };
                (star, decision)
            })
            .collect()
    }

    /// Routing decision of every star of `bgp`, without fetching anything.
    pub fn plan_decisions(&self, bgp: &Bgp, catalog: &PartitionCatalog) -> Vec<StarDecision> {
        self.decide(bgp, catalog)
            .into_iter()
            .map(|(star, decision)| {
                let route = match decision {
                    Decision::Route(families) => Route::Routed {
                        families: families.iter().map(|family| family.name.clone()).collect(),
                    },
                    Decision::Ineligible(reason) => {
                        Route::Fallback(FallbackReason::Ineligible(reason))
                    }
                    Decision::Declined(reason) => Route::Fallback(FallbackReason::Declined(reason)),
                };
                StarDecision {
                    predicates: star_predicates(&star, bgp),
                    subject: star.subject_key,
                    positions: star.positions,
                    route,
                }
            })
            .collect()
    }

    /// Builds the routing plan for `bgp`, downloading the partition files of all
    /// routed stars concurrently.
    pub async fn plan(
        &self,
        bgp: &Bgp,
        catalog: &PartitionCatalog,
        index_uri: &str,
        context: &QueryContext,
    ) -> Result<RoutingPlan> {
        let mut fallback = Vec::new();
        let mut declined = Vec::new();
        let mut candidates = Vec::new();

        for (star, decision) in self.decide(bgp, catalog) {
            match decision {
                Decision::Route(families) => candidates.push((star, families)),
                Decision::Ineligible(_) => fallback.extend_from_slice(&star.positions),
                Decision::Declined(_) => declined.extend_from_slice(&star.positions),
            }
        }
        debug!(
            "Identified {} SmartKG star patterns and {} remaining triple patterns",
            candidates.len(),
            fallback.len() + declined.len()
        );
        fallback.extend(declined);

        let routed = try_join_all(candidates.into_iter().map(|(star, families)| async move {
            let sources =
                self.selector.fetch_families(&families, index_uri, &self.cache, context).await?;
            Ok::<_, Error>(RoutedStar { star, sources })
        }))
        .await?;

        Ok(RoutingPlan { routed, fallback })
    }
}
