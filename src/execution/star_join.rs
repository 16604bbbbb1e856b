//! Star-join strategy: evaluate the parts separately, then join them.

use crate::config::StrategyKind;
use crate::core::{Bgp, Bindings, EvaluationOutput, Operation, QueryContext};
use crate::error::Result;
use crate::execution::ExecutionStrategy;
use crate::routing::RoutingPlan;
use crate::services::{JoinService, QueryEvaluator};
use async_trait::async_trait;
use futures_util::future::{try_join_all, BoxFuture};
use std::sync::Arc;
use tracing::debug;

/// Evaluates every routed star as its own BGP over its local sources and the
/// fallback patterns as one BGP over the caller's sources, all concurrently, and
/// passes the partial results to the join service.
///
/// The join service receives the parts in plan order, but must not rely on it.
pub struct StarJoinStrategy {
    evaluator: Arc<dyn QueryEvaluator>,
    join: Arc<dyn JoinService>,
}

impl StarJoinStrategy {
    pub fn new(evaluator: Arc<dyn QueryEvaluator>, join: Arc<dyn JoinService>) -> Self {
        Self { evaluator, join }
    }
}

#[async_trait]
impl ExecutionStrategy for StarJoinStrategy {
    async fn execute(
        &self,
        bgp: &Bgp,
        plan: RoutingPlan,
        context: &QueryContext,
    ) -> Result<EvaluationOutput> {
        let marked = context.with_router_passed();
        let mut parts: Vec<BoxFuture<'_, Result<EvaluationOutput>>> = Vec::new();

        for routed in &plan.routed {
            let operation = Operation::Bgp(routed.star.to_bgp(bgp));
            let star_context = marked.with_sources(routed.sources.clone());
            parts.push(self.evaluator.evaluate(operation, star_context));
        }

        if !plan.fallback.is_empty() {
            let operation = Operation::Bgp(plan.fallback_bgp(bgp));
            parts.push(self.evaluator.evaluate(operation, marked.clone()));
        }

        debug!("Joining {} partial results", parts.len());
        let mut entries = try_join_all(parts).await?;
        if entries.len() == 1 {
            return Ok(entries.remove(0));
        }
        if entries.is_empty() {
            // The empty conjunction has exactly one solution.
            return Ok(EvaluationOutput::from_bindings(Vec::new(), vec![Bindings::new()]));
        }
        self.join.join(entries).await
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::StarJoin
    }
}
