//! # SmartKG
//!
//! Star-pattern routing for basic graph patterns (BGPs) over sources that
//! publish a SmartKG partition index next to their triple pattern fragments
//! interface.
//!
//! A SmartKG source offers two access modes: precomputed, predicate-partitioned
//! data files ("families") that can be downloaded wholesale and queried locally,
//! and the generic fragment interface that answers one pattern at a time over
//! the network. For every BGP this crate decides, per star-shaped sub-pattern,
//! whether downloading a family is worth it, which families to download, keeps
//! the downloads in a process-wide on-disk cache, and recombines the partial
//! results with one of two execution strategies.
//!
//! ## Features
//!
//! - Star decomposition and eligibility classification of BGPs
//! - Family selection under a grouped / minimal / threshold / non-original cascade
//! - Content-addressed object cache with request de-duplication and tee-ing
//! - Reinjection and star-join execution strategies
//! - Optional empty-pattern short-circuit
//!
//! ## Example
//!
//! ```rust
//! use smartkg::parsing::sparql_bgp::parse_bgps;
//! use smartkg::routing::star_decomposer::decompose;
//!
//! fn example() -> smartkg::Result<()> {
//!     let bgps = parse_bgps(
//!         "SELECT * WHERE { ?x <http://ex.org/p1> ?y . ?x <http://ex.org/p2> ?z }",
//!     )?;
//!     let stars = decompose(&bgps[0]);
//!     assert_eq!(stars.len(), 1);
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::new_without_default)]
#![allow(clippy::needless_pass_by_value)]

/// Query model: patterns, BGPs, contexts and evaluation outputs
pub mod core;

/// Local object cache for catalogs and partition files
pub mod cache;

/// SmartKG partition catalog and its loader
pub mod catalog;

/// Router configuration
pub mod config;

/// Execution strategies recombining routed stars and fallback patterns
pub mod execution;

/// SPARQL front end
pub mod parsing;

/// Source resolution, star decomposition, family selection and the router itself
pub mod routing;

/// Interfaces of the collaborating services
pub mod services;

pub mod error {
    //! Error types and result definitions

    use thiserror::Error;

    /// Result type alias for SmartKG operations
    pub type Result<T> = std::result::Result<T, Error>;

    /// Reasons for the router to refuse a query in its admission test.
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum AdmissionError {
        /// The context already carries the router marker
        #[error("the router can only operate once on a BGP")]
        AlreadyRouted,
        /// Star routing needs at least two patterns
        #[error("the router can only operate on BGPs with at least two patterns, got {0}")]
        TooFewPatterns(usize),
        /// No single, partition-enabled source given by URI
        #[error("the router requires exactly one SmartKG-enabled source")]
        NoPartitionedSource,
        /// Only BGP operations are routed
        #[error("the router only handles BGP operations")]
        UnsupportedOperation,
    }

    /// Main error type for SmartKG
    #[derive(Error, Debug)]
    pub enum Error {
        /// The router does not apply to this query; try another evaluator
        #[error("Admission error: {0}")]
        Admission(#[from] AdmissionError),
        /// The partition catalog could not be parsed
        #[error("Catalog parse error for {uri}: {source}")]
        CatalogParse {
            uri: String,
            #[source]
            source: serde_json::Error,
        },
        /// Network failure while retrieving a remote resource
        #[error("Fetch error for {uri}: {reason}")]
        Fetch { uri: String, reason: String },
        /// Disk failure in the object cache
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
        /// Invalid configuration
        #[error("Configuration error: {0}")]
        Config(String),
        /// Invalid SPARQL query text
        #[error("Parse error: {0}")]
        Parse(String),
        /// Failure reported by an evaluation or join service
        #[error("Evaluation error: {0}")]
        Evaluation(String),
    }

    impl Error {
        /// Whether this error only means "the router is not applicable".
        pub fn is_admission(&self) -> bool {
            matches!(self, Error::Admission(_))
        }
    }
}

// Re-export commonly used types
pub use error::{AdmissionError, Error, Result};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Config("test error".to_string());
        assert_eq!(format!("{}", err), "Configuration error: test error");
    }

    #[test]
    fn test_admission_error_conversion() {
        let err: Error = AdmissionError::TooFewPatterns(1).into();
        assert!(err.is_admission());
        assert_eq!(
            err.to_string(),
            "Admission error: the router can only operate on BGPs with at least two patterns, got 1"
        );
    }
}
