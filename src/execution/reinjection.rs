//! Reinjection strategy: one annotated BGP back into the evaluator.

use crate::config::StrategyKind;
use crate::core::{Bgp, EvaluationOutput, Operation, QueryContext};
use crate::error::Result;
use crate::execution::ExecutionStrategy;
use crate::routing::RoutingPlan;
use crate::services::QueryEvaluator;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Attaches the chosen local sources to the patterns of every routed star and
/// re-dispatches the entire BGP.
///
/// Fallback patterns keep the caller's sources. The downstream evaluator decides
/// the join order for everything.
pub struct ReinjectionStrategy {
    evaluator: Arc<dyn QueryEvaluator>,
}

impl ReinjectionStrategy {
    pub fn new(evaluator: Arc<dyn QueryEvaluator>) -> Self {
        Self { evaluator }
    }

    /// Per-position contexts for `bgp` under `plan`, all carrying the router marker.
    pub fn annotate(bgp: &Bgp, plan: &RoutingPlan, context: &QueryContext) -> Vec<QueryContext> {
        let marked = context.with_router_passed();
        let mut contexts = vec![marked.clone(); bgp.len()];

        for routed in &plan.routed {
            let star_context = marked.with_sources(routed.sources.clone());
            for &position in &routed.star.positions {
                if let Some(slot) = contexts.get_mut(position) {
                    *slot = star_context.clone();
                }
            }
        }

        contexts
    }
}

#[async_trait]
impl ExecutionStrategy for ReinjectionStrategy {
    async fn execute(
        &self,
        bgp: &Bgp,
        plan: RoutingPlan,
        context: &QueryContext,
    ) -> Result<EvaluationOutput> {
        debug!(
            "Reinjecting BGP with {} routed stars and {} fallback patterns",
            plan.routed.len(),
            plan.fallback.len()
        );
        let contexts = Self::annotate(bgp, &plan, context);
        let operation = Operation::AnnotatedBgp { bgp: bgp.clone(), contexts };
        self.evaluator.evaluate(operation, context.with_router_passed()).await
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Reinjection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DataSource, QuadPattern};
    use crate::routing::{RoutedStar, Star};
    use oxrdf::{NamedNode, Variable};

    fn pattern(subject: &str, predicate: &str) -> QuadPattern {
        QuadPattern::new(
            Variable::new_unchecked(subject),
            NamedNode::new_unchecked(format!("http://ex.org/{}", predicate)),
            Variable::new_unchecked("o"),
        )
    }

    #[test]
    fn test_annotate_assigns_star_sources_by_position() {
        let bgp = Bgp::new(vec![pattern("x", "p1"), pattern("w", "p3"), pattern("x", "p2")]);
        let plan = RoutingPlan {
            routed: vec![RoutedStar {
                star: Star { subject_key: "?x".to_string(), positions: vec![0, 2] },
                sources: vec![DataSource::hdt_file("cache/f1")],
            }],
            fallback: vec![1],
        };
        let context = QueryContext::new().with_source(DataSource::uri("http://quantum.ex.org/watdiv"));

        let contexts = ReinjectionStrategy::annotate(&bgp, &plan, &context);

        assert_eq!(contexts.len(), 3);
        assert!(contexts.iter().all(QueryContext::router_passed));
        let source_of = |i: usize| contexts[i].sources().unwrap()[0].clone();
        assert!(source_of(0).as_path().is_some());
        assert!(source_of(2).as_path().is_some());
        assert_eq!(source_of(1).as_uri(), Some("http://quantum.ex.org/watdiv"));
        assert!(!context.router_passed());
    }
}
