//! Router configuration.
//!
//! All options have defaults, so a JSON config file only needs the fields it
//! wants to change:
//!
//! ```json
//! { "max_families": 3, "strategy": "star_join", "test_empty_patterns": true }
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How routed stars and fallback patterns are recombined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Re-dispatch the whole BGP with per-pattern sources attached
    #[default]
    Reinjection,
    /// Evaluate every routed star separately and join explicitly
    StarJoin,
}

/// Naming convention mapping a fragments URI to its SmartKG index URI.
///
/// A source is partition-enabled when its URI contains `marker`; the index URI is
/// the source URI with the first match of `pattern` replaced by `replacement`
/// (regex replacement syntax, so `$1` refers to capture groups).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceRule {
    pub marker: String,
    pub pattern: String,
    pub replacement: String,
}

impl Default for SourceRule {
    fn default() -> Self {
        Self {
            marker: "quantum".to_string(),
            pattern: "watdiv".to_string(),
            replacement: "molecule/watdiv".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Probe every pattern first and stop early when one of them has no matches
    pub test_empty_patterns: bool,
    /// Maximum number of candidate families a star may be routed to
    pub max_families: usize,
    /// Also download `<family>.index.v1-1` next to every partition file
    pub fetch_hdt_index_files: bool,
    /// Directory of the object cache, relative to the working directory
    pub cache_dir: PathBuf,
    pub strategy: StrategyKind,
    pub source_rule: SourceRule,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            test_empty_patterns: false,
            max_families: 5,
            fetch_hdt_index_files: false,
            cache_dir: PathBuf::from(".smartkg-cache"),
            strategy: StrategyKind::default(),
            source_rule: SourceRule::default(),
        }
    }
}

impl RouterConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }
}
