//! Quad patterns and basic graph patterns.

use oxrdf::Variable;
use spargebra::term::{GraphNamePattern, NamedNodePattern, TermPattern, TriplePattern};
use std::fmt;

/// A triple template with an optional graph, each position a bound term or a variable.
///
/// Patterns are immutable value records. Per-pattern execution contexts are not
/// stored on the pattern; they travel in a side table aligned with the pattern's
/// position in its [`Bgp`] (see [`crate::core::Operation::AnnotatedBgp`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuadPattern {
    pub subject: TermPattern,
    pub predicate: NamedNodePattern,
    pub object: TermPattern,
    pub graph: GraphNamePattern,
}

impl QuadPattern {
    pub fn new(
        subject: impl Into<TermPattern>,
        predicate: impl Into<NamedNodePattern>,
        object: impl Into<TermPattern>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            graph: GraphNamePattern::DefaultGraph,
        }
    }

    #[must_use]
    pub fn in_graph(mut self, graph: GraphNamePattern) -> Self {
        self.graph = graph;
        self
    }

    /// Canonical string form of the subject, used as the star key.
    pub fn subject_key(&self) -> String {
        self.subject.to_string()
    }

    /// The predicate IRI, or `None` when the predicate is a variable.
    pub fn predicate_iri(&self) -> Option<&str> {
        match &self.predicate {
            NamedNodePattern::NamedNode(node) => Some(node.as_str()),
            NamedNodePattern::Variable(_) => None,
        }
    }

    pub fn has_variable_predicate(&self) -> bool {
        matches!(self.predicate, NamedNodePattern::Variable(_))
    }

    /// Variables in subject, predicate, object, graph order, without duplicates.
    pub fn variables(&self) -> Vec<Variable> {
        let mut variables = Vec::new();
        let mut push = |variable: &Variable| {
            if !variables.contains(variable) {
                variables.push(variable.clone());
            }
        };
        if let TermPattern::Variable(v) = &self.subject {
            push(v);
        }
        if let NamedNodePattern::Variable(v) = &self.predicate {
            push(v);
        }
        if let TermPattern::Variable(v) = &self.object {
            push(v);
        }
        if let GraphNamePattern::Variable(v) = &self.graph {
            push(v);
        }
        variables
    }
}

impl From<TriplePattern> for QuadPattern {
    fn from(triple: TriplePattern) -> Self {
        Self {
            subject: triple.subject,
            predicate: triple.predicate,
            object: triple.object,
            graph: GraphNamePattern::DefaultGraph,
        }
    }
}

impl fmt::Display for QuadPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.graph {
            GraphNamePattern::DefaultGraph => {
                write!(f, "{} {} {}", self.subject, self.predicate, self.object)
            }
            graph => write!(f, "{} {} {} {}", self.subject, self.predicate, self.object, graph),
        }
    }
}

/// A basic graph pattern: an ordered conjunction of quad patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bgp {
    patterns: Vec<QuadPattern>,
}

impl Bgp {
    pub fn new(patterns: Vec<QuadPattern>) -> Self {
        Self { patterns }
    }

    pub fn patterns(&self) -> &[QuadPattern] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Builds a new BGP out of the patterns at the given positions, in the given order.
    ///
    /// Positions out of range are skipped.
    pub fn select(&self, positions: &[usize]) -> Bgp {
        Bgp::new(positions.iter().filter_map(|&i| self.patterns.get(i).cloned()).collect())
    }

    /// Variables of all patterns in first-seen order.
    pub fn variables(&self) -> Vec<Variable> {
        let mut variables: Vec<Variable> = Vec::new();
        for pattern in &self.patterns {
            for variable in pattern.variables() {
                if !variables.contains(&variable) {
                    variables.push(variable);
                }
            }
        }
        variables
    }
}

impl From<Vec<QuadPattern>> for Bgp {
    fn from(patterns: Vec<QuadPattern>) -> Self {
        Bgp::new(patterns)
    }
}

impl fmt::Display for Bgp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ ")?;
        for pattern in &self.patterns {
            write!(f, "{} . ", pattern)?;
        }
        write!(f, "}}")
    }
}
