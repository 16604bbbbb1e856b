//! Source Resolver
//!
//! Maps the single dataset URI of a query context to the URI of its SmartKG
//! partition index. Which sources are partition-enabled, and where their index
//! lives, follows a naming convention given by [`SourceRule`]:
//!
//! ```text
//! http://quantum.ex.org/watdiv  ->  http://quantum.ex.org/molecule/watdiv
//! ```
//!
//! Mappings are memoized for the lifetime of the resolver, which is shared by all
//! concurrent queries.

use crate::config::SourceRule;
use crate::core::QueryContext;
use crate::error::{Error, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

pub struct SourceResolver {
    marker: String,
    pattern: Regex,
    replacement: String,
    memo: RwLock<HashMap<String, Option<String>>>,
}

impl SourceResolver {
    /// Compiles the rule's pattern. An invalid regex is a configuration error.
    pub fn new(rule: &SourceRule) -> Result<Self> {
        let pattern = Regex::new(&rule.pattern).map_err(|e| {
            Error::Config(format!("Invalid source rule pattern '{}': {}", rule.pattern, e))
        })?;

        Ok(Self {
            marker: rule.marker.clone(),
            pattern,
            replacement: rule.replacement.clone(),
            memo: RwLock::new(HashMap::new()),
        })
    }

    /// The URI of the only source in `context`.
    ///
    /// Returns `None` unless exactly one source is configured and it is given by
    /// URI string.
    pub fn resolve(context: &QueryContext) -> Option<&str> {
        match context.sources() {
            Some([source]) => source.as_uri(),
            _ => None,
        }
    }

    /// The partition index URI for `uri`, or `None` when `uri` is not a
    /// partition-enabled source.
    pub fn index_uri(&self, uri: &str) -> Option<String> {
        if let Some(cached) =
            self.memo.read().unwrap_or_else(PoisonError::into_inner).get(uri)
        {
            return cached.clone();
        }

        let index_uri = if uri.contains(&self.marker) && self.pattern.is_match(uri) {
            Some(self.pattern.replace(uri, self.replacement.as_str()).into_owned())
        } else {
            None
        };

        self.memo
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(uri.to_string(), index_uri.clone());
        index_uri
    }

    /// Index URI of the context's single source, if it is partition-enabled.
    pub fn index_uri_for(&self, context: &QueryContext) -> Option<String> {
        Self::resolve(context).and_then(|uri| self.index_uri(uri))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DataSource;

    fn resolver() -> SourceResolver {
        SourceResolver::new(&SourceRule::default()).unwrap()
    }

    #[test]
    fn test_index_uri_default_rule() {
        let resolver = resolver();
        assert_eq!(
            resolver.index_uri("http://quantum.ex.org/watdiv").as_deref(),
            Some("http://quantum.ex.org/molecule/watdiv")
        );
    }

    #[test]
    fn test_only_first_match_is_rewritten() {
        let resolver = resolver();
        assert_eq!(
            resolver.index_uri("http://quantum.ex.org/watdiv/watdiv").as_deref(),
            Some("http://quantum.ex.org/molecule/watdiv/watdiv")
        );
    }

    #[test]
    fn test_not_partition_enabled() {
        let resolver = resolver();
        assert_eq!(resolver.index_uri("http://fragments.ex.org/watdiv"), None);
        assert_eq!(resolver.index_uri("http://quantum.ex.org/dbpedia"), None);
        // Memoized negative answers stay negative.
        assert_eq!(resolver.index_uri("http://quantum.ex.org/dbpedia"), None);
    }

    #[test]
    fn test_custom_rule_with_capture_groups() {
        let rule = SourceRule {
            marker: "kg".to_string(),
            pattern: r"/data/(\w+)$".to_string(),
            replacement: "/index/$1".to_string(),
        };
        let resolver = SourceResolver::new(&rule).unwrap();
        assert_eq!(
            resolver.index_uri("http://kg.ex.org/data/people").as_deref(),
            Some("http://kg.ex.org/index/people")
        );
    }

    #[test]
    fn test_invalid_pattern() {
        let rule = SourceRule { pattern: "(".to_string(), ..SourceRule::default() };
        assert!(matches!(SourceResolver::new(&rule), Err(Error::Config(_))));
    }

    #[test]
    fn test_resolve_requires_single_uri_source() {
        let uri = "http://quantum.ex.org/watdiv";

        assert_eq!(SourceResolver::resolve(&QueryContext::new()), None);
        assert_eq!(
            SourceResolver::resolve(&QueryContext::new().with_source(DataSource::uri(uri))),
            Some(uri)
        );

        let two = QueryContext::new().with_sources(vec![DataSource::uri(uri), DataSource::uri(uri)]);
        assert_eq!(SourceResolver::resolve(&two), None);

        let file = QueryContext::new().with_source(DataSource::hdt_file("/tmp/watdiv.hdt"));
        assert_eq!(SourceResolver::resolve(&file), None);
    }
}
