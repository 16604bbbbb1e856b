//! The BGP router: admission test, empty-pattern short-circuit and run.

use crate::cache::ObjectCache;
use crate::catalog::PartitionCatalog;
use crate::config::RouterConfig;
use crate::core::{Bgp, EvaluationOutput, Operation, QueryContext};
use crate::error::{AdmissionError, Result};
use crate::execution::{build_strategy, ExecutionStrategy};
use crate::routing::planner::{RoutingPlanner, StarDecision};
use crate::services::{HttpFetcher, JoinService, QueryEvaluator};
use async_trait::async_trait;
use futures_util::future::try_join_all;
use std::sync::Arc;
use tracing::debug;

/// Outcome of a successful admission test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterTest {
    /// Estimated number of HTTP requests, one per pattern
    pub http_requests: usize,
}

/// Routes the stars of a BGP to SmartKG partition files.
///
/// The router is itself a [`QueryEvaluator`]: evaluating a BGP runs the admission
/// test and then [`BgpRouter::run`]. Sub-evaluations go to the injected
/// evaluator with the router marker set.
pub struct BgpRouter {
    config: RouterConfig,
    planner: RoutingPlanner,
    evaluator: Arc<dyn QueryEvaluator>,
    strategy: Arc<dyn ExecutionStrategy>,
}

impl BgpRouter {
    /// Builds a router with its own object cache in `config.cache_dir`.
    pub fn new(
        config: RouterConfig,
        fetcher: Arc<dyn HttpFetcher>,
        evaluator: Arc<dyn QueryEvaluator>,
        join: Arc<dyn JoinService>,
    ) -> Result<Self> {
        let cache = Arc::new(ObjectCache::new(config.cache_dir.clone(), fetcher)?);
        Self::with_cache(config, cache, evaluator, join)
    }

    /// Builds a router on a cache shared with other routers of the process.
    pub fn with_cache(
        config: RouterConfig,
        cache: Arc<ObjectCache>,
        evaluator: Arc<dyn QueryEvaluator>,
        join: Arc<dyn JoinService>,
    ) -> Result<Self> {
        let planner = RoutingPlanner::new(&config, cache)?;
        let strategy = build_strategy(config.strategy, Arc::clone(&evaluator), join);
        Ok(Self { config, planner, evaluator, strategy })
    }

    /// Replaces the execution strategy chosen by the configuration.
    #[must_use]
    pub fn with_strategy(mut self, strategy: Arc<dyn ExecutionStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn planner(&self) -> &RoutingPlanner {
        &self.planner
    }

    pub fn strategy(&self) -> &Arc<dyn ExecutionStrategy> {
        &self.strategy
    }

    /// Per-star routing decisions for `bgp` against an already loaded catalog.
    pub fn plan_decisions(&self, bgp: &Bgp, catalog: &PartitionCatalog) -> Vec<StarDecision> {
        self.planner.plan_decisions(bgp, catalog)
    }

    /// Checks whether this router applies to `bgp` under `context`.
    ///
    /// Cheap: no network or disk access.
    pub fn test(&self, bgp: &Bgp, context: &QueryContext) -> Result<RouterTest> {
        if context.router_passed() {
            return Err(AdmissionError::AlreadyRouted.into());
        }
        if bgp.len() < 2 {
            return Err(AdmissionError::TooFewPatterns(bgp.len()).into());
        }
        if self.planner.index_uri(context).is_none() {
            return Err(AdmissionError::NoPartitionedSource.into());
        }
        Ok(RouterTest { http_requests: bgp.len() })
    }

    /// Evaluates `bgp`, assuming [`BgpRouter::test`] passed.
    pub async fn run(&self, bgp: &Bgp, context: &QueryContext) -> Result<EvaluationOutput> {
        let index_uri =
            self.planner.index_uri(context).ok_or(AdmissionError::NoPartitionedSource)?;

        if self.config.test_empty_patterns && self.has_empty_pattern(bgp, context).await? {
            debug!("A pattern has no matches, the BGP is empty");
            return Ok(EvaluationOutput::empty());
        }

        let catalog = self.planner.load_catalog(&index_uri, context).await?;
        let plan = self.planner.plan(bgp, &catalog, &index_uri, context).await?;
        self.strategy.execute(bgp, plan, context).await
    }

    /// Probes every pattern through the evaluator and reports whether any of them
    /// is known to have no matches. All probe streams are closed.
    async fn has_empty_pattern(&self, bgp: &Bgp, context: &QueryContext) -> Result<bool> {
        let marked = context.with_router_passed();
        let outputs = try_join_all(bgp.patterns().iter().map(|pattern| {
            self.evaluator.evaluate(Operation::Pattern(pattern.clone()), marked.clone())
        }))
        .await?;

        let empty = outputs.iter().any(EvaluationOutput::is_known_empty);
        outputs.into_iter().for_each(EvaluationOutput::close);
        Ok(empty)
    }
}

#[async_trait]
impl QueryEvaluator for BgpRouter {
    async fn evaluate(
        &self,
        operation: Operation,
        context: QueryContext,
    ) -> Result<EvaluationOutput> {
        match operation {
            Operation::Bgp(bgp) => {
                self.test(&bgp, &context)?;
                self.run(&bgp, &context).await
            }
            _ => Err(AdmissionError::UnsupportedOperation.into()),
        }
    }
}

/// Sends BGPs the router accepts to the router and everything else, unchanged,
/// to `fallback`.
pub struct RoutingEvaluator {
    router: Arc<BgpRouter>,
    fallback: Arc<dyn QueryEvaluator>,
}

impl RoutingEvaluator {
    pub fn new(router: Arc<BgpRouter>, fallback: Arc<dyn QueryEvaluator>) -> Self {
        Self { router, fallback }
    }
}

#[async_trait]
impl QueryEvaluator for RoutingEvaluator {
    async fn evaluate(
        &self,
        operation: Operation,
        context: QueryContext,
    ) -> Result<EvaluationOutput> {
        if let Operation::Bgp(bgp) = &operation {
            match self.router.test(bgp, &context) {
                Ok(_) => return self.router.run(bgp, &context).await,
                Err(e) => debug!("Router not applicable: {}", e),
            }
        }
        self.fallback.evaluate(operation, context).await
    }
}
