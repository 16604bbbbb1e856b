//! Execution Strategies
//!
//! Both strategies receive the [`RoutingPlan`] built by the shared routing
//! pipeline and differ only in how routed stars and fallback patterns are turned
//! into one result.
//!
//! # Components
//!
//! - **Reinjection** - Re-dispatches the whole BGP with a context per pattern and
//!   lets the downstream evaluator join everything
//! - **StarJoin** - Evaluates every routed star and the fallback BGP on their own,
//!   concurrently, then hands all partial results to the join service
//!
//! Every context either strategy hands to the evaluator carries the router
//! marker, so the router never picks up its own sub-evaluations.
//!
//! # Example
//!
//! ```ignore
//! use smartkg::config::StrategyKind;
//! use smartkg::execution::build_strategy;
//!
//! let strategy = build_strategy(StrategyKind::StarJoin, evaluator, join);
//! let output = strategy.execute(&bgp, plan, &context).await?;
//! ```

pub mod reinjection;
pub mod star_join;

pub use reinjection::ReinjectionStrategy;
pub use star_join::StarJoinStrategy;

use crate::config::StrategyKind;
use crate::core::{Bgp, EvaluationOutput, QueryContext};
use crate::error::Result;
use crate::routing::RoutingPlan;
use crate::services::{JoinService, QueryEvaluator};
use async_trait::async_trait;
use std::sync::Arc;

/// Final recombination step of the router.
#[async_trait]
pub trait ExecutionStrategy: Send + Sync {
    /// Evaluates `bgp` according to `plan`.
    ///
    /// `context` is the context the router was invoked with.
    async fn execute(
        &self,
        bgp: &Bgp,
        plan: RoutingPlan,
        context: &QueryContext,
    ) -> Result<EvaluationOutput>;

    fn kind(&self) -> StrategyKind;
}

pub fn build_strategy(
    kind: StrategyKind,
    evaluator: Arc<dyn QueryEvaluator>,
    join: Arc<dyn JoinService>,
) -> Arc<dyn ExecutionStrategy> {
    match kind {
        StrategyKind::Reinjection => Arc::new(ReinjectionStrategy::new(evaluator)),
        StrategyKind::StarJoin => Arc::new(StarJoinStrategy::new(evaluator, join)),
    }
}
