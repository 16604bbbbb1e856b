//! Operations handed to evaluation services and the outputs they return.

use crate::core::{Bgp, QueryContext, QuadPattern};
use crate::error::Result;
use futures_util::stream::{self, BoxStream, StreamExt};
use oxrdf::{Term, Variable};
use std::collections::HashMap;
use std::fmt;

/// One solution: variable to bound term.
pub type Bindings = HashMap<Variable, Term>;

/// Asynchronous stream of solutions. Dropping the stream closes it.
pub type BindingsStream = BoxStream<'static, Result<Bindings>>;

/// An operation submitted to a [`QueryEvaluator`](crate::services::QueryEvaluator).
#[derive(Debug, Clone)]
pub enum Operation {
    /// A single quad pattern
    Pattern(QuadPattern),
    /// A BGP evaluated entirely under the operation's context
    Bgp(Bgp),
    /// A BGP whose patterns each carry their own context.
    ///
    /// `contexts[i]` applies to `bgp.patterns()[i]`; both have the same length.
    AnnotatedBgp { bgp: Bgp, contexts: Vec<QueryContext> },
}

impl Operation {
    /// The BGP behind a BGP-shaped operation.
    pub fn bgp(&self) -> Option<&Bgp> {
        match self {
            Operation::Pattern(_) => None,
            Operation::Bgp(bgp) | Operation::AnnotatedBgp { bgp, .. } => Some(bgp),
        }
    }
}

/// Metadata reported alongside a bindings stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Estimated or exact number of solutions, when known
    pub total_items: Option<u64>,
}

/// Result of evaluating an operation.
pub struct EvaluationOutput {
    pub bindings: BindingsStream,
    pub variables: Vec<Variable>,
    metadata: Metadata,
}

impl EvaluationOutput {
    pub fn new(bindings: BindingsStream, variables: Vec<Variable>, metadata: Metadata) -> Self {
        Self { bindings, variables, metadata }
    }

    /// An output with no solutions, no variables and `total_items = 0`.
    pub fn empty() -> Self {
        Self::new(
            stream::empty::<Result<Bindings>>().boxed(),
            Vec::new(),
            Metadata { total_items: Some(0) },
        )
    }

    /// An output over an in-memory list of solutions.
    pub fn from_bindings(variables: Vec<Variable>, bindings: Vec<Bindings>) -> Self {
        let total = bindings.len() as u64;
        Self::new(
            stream::iter(bindings.into_iter().map(Ok)).boxed(),
            variables,
            Metadata { total_items: Some(total) },
        )
    }

    pub fn metadata(&self) -> Metadata {
        self.metadata
    }

    /// Whether the metadata guarantees that there are no solutions.
    pub fn is_known_empty(&self) -> bool {
        self.metadata.total_items == Some(0)
    }

    /// Closes the bindings stream without reading it.
    pub fn close(self) {
        drop(self.bindings);
    }

    /// Drains the stream into a vector.
    pub async fn collect(self) -> Result<Vec<Bindings>> {
        let mut solutions = Vec::new();
        let mut bindings = self.bindings;
        while let Some(solution) = bindings.next().await {
            solutions.push(solution?);
        }
        Ok(solutions)
    }
}

impl fmt::Debug for EvaluationOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationOutput")
            .field("variables", &self.variables)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}
