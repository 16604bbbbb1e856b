//! Star-pattern routing
//!
//! Control flow for one BGP:
//!
//! 1. [`SourceResolver`] - single source URI -> partition index URI
//! 2. [`crate::catalog::load_catalog`] - fetch and parse the partition catalog
//! 3. [`decompose`] - group patterns into stars
//! 4. [`eligibility::classify`] - drop stars not worth routing
//! 5. [`FamilySelector`] - choose and fetch partition files, or decline
//! 6. [`crate::execution`] - recombine routed stars and fallback patterns

pub mod eligibility;
pub mod family_selector;
pub mod planner;
pub mod router;
pub mod source_resolver;
pub mod star_decomposer;

pub use family_selector::{DeclineReason, FamilySelector, Selection};
pub use planner::{FallbackReason, Route, RoutedStar, RoutingPlan, RoutingPlanner, StarDecision};
pub use router::{BgpRouter, RouterTest, RoutingEvaluator};
pub use source_resolver::SourceResolver;
pub use star_decomposer::{decompose, Star};
