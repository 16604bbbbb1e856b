//! Extraction of basic graph patterns from SPARQL query text.

use crate::core::{Bgp, QuadPattern};
use crate::error::{Error, Result};
use spargebra::algebra::GraphPattern;
use spargebra::term::{GraphNamePattern, NamedNodePattern};
use spargebra::Query;

/// Parses `query` and returns all of its BGPs in depth-first, left-to-right order.
///
/// Patterns inside `GRAPH` blocks carry the graph name. BGPs inside `SERVICE`
/// blocks are left out: they belong to another endpoint. Empty BGPs are skipped.
pub fn parse_bgps(query: &str) -> Result<Vec<Bgp>> {
    let query = Query::parse(query, None).map_err(|e| Error::Parse(e.to_string()))?;
    let pattern = match &query {
        Query::Select { pattern, .. }
        | Query::Construct { pattern, .. }
        | Query::Describe { pattern, .. }
        | Query::Ask { pattern, .. } => pattern,
    };

    let mut bgps = Vec::new();
    collect_bgps(pattern, &GraphNamePattern::DefaultGraph, &mut bgps);
    Ok(bgps)
}

fn collect_bgps(pattern: &GraphPattern, graph: &GraphNamePattern, bgps: &mut Vec<Bgp>) {
    match pattern {
        GraphPattern::Bgp { patterns } => {
            if !patterns.is_empty() {
                bgps.push(Bgp::new(
                    patterns
                        .iter()
                        .map(|triple| QuadPattern::from(triple.clone()).in_graph(graph.clone()))
                        .collect(),
                ));
            }
        }
        GraphPattern::Join { left, right }
        | GraphPattern::LeftJoin { left, right, .. }
        | GraphPattern::Union { left, right }
        | GraphPattern::Minus { left, right } => {
            collect_bgps(left, graph, bgps);
            collect_bgps(right, graph, bgps);
        }
        GraphPattern::Graph { name, inner } => {
            let name = match name {
                NamedNodePattern::NamedNode(node) => GraphNamePattern::NamedNode(node.clone()),
                NamedNodePattern::Variable(variable) => GraphNamePattern::Variable(variable.clone()),
            };
            collect_bgps(inner, &name, bgps);
        }
        GraphPattern::Filter { inner, .. }
        | GraphPattern::Extend { inner, .. }
        | GraphPattern::OrderBy { inner, .. }
        | GraphPattern::Project { inner, .. }
        | GraphPattern::Distinct { inner }
        | GraphPattern::Reduced { inner }
        | GraphPattern::Slice { inner, .. }
        | GraphPattern::Group { inner, .. } => collect_bgps(inner, graph, bgps),
        _ => {}
    }
}
