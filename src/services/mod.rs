//! Collaborating services consumed by the router.
//!
//! The router never evaluates patterns, speaks HTTP or joins streams itself.
//! It talks to three injected services:
//!
//! - [`HttpFetcher`] - raw byte access to remote resources
//! - [`QueryEvaluator`] - generic pattern/BGP evaluation, including evaluation over
//!   local partition files when a context names them as sources
//! - [`JoinService`] - merges several partial results into one
//!
//! The router itself implements [`QueryEvaluator`], so it plugs into any pipeline
//! that accepts an evaluator.

pub mod http_fetcher;

pub use http_fetcher::ReqwestFetcher;

use crate::core::{EvaluationOutput, Operation, QueryContext};
use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;

/// A stream of body chunks.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Fetches remote resources.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// Starts a request for `uri` and returns its body stream.
    ///
    /// Failures are reported as [`crate::Error::Fetch`] and are not retried.
    async fn fetch(&self, uri: &str, context: &QueryContext) -> Result<ByteStream>;
}

/// Evaluates patterns and BGPs.
#[async_trait]
pub trait QueryEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        operation: Operation,
        context: QueryContext,
    ) -> Result<EvaluationOutput>;
}

/// Joins two or more partial results on their shared variables.
///
/// Implementations must not rely on the order of `entries`.
#[async_trait]
pub trait JoinService: Send + Sync {
    async fn join(&self, entries: Vec<EvaluationOutput>) -> Result<EvaluationOutput>;
}
