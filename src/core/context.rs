//! Query execution context and data source descriptors.

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// How a data source should be accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Hypermedia interface, usually a triple pattern fragments endpoint
    Hypermedia,
    /// SPARQL endpoint
    Sparql,
    /// Local HDT partition file
    HdtFile,
}

/// The value identifying a data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceValue {
    /// A remote source given by URI
    Uri(String),
    /// A file on the local file system
    Path(PathBuf),
}

/// A data source descriptor, optionally typed.
#[derive(Debug, Clone)]
pub struct DataSource {
    pub kind: Option<SourceKind>,
    pub value: SourceValue,
}

impl DataSource {
    /// An untyped source given by URI.
    pub fn uri(uri: impl Into<String>) -> Self {
        Self { kind: None, value: SourceValue::Uri(uri.into()) }
    }

    /// A local HDT partition file.
    pub fn hdt_file(path: impl Into<PathBuf>) -> Self {
        Self { kind: Some(SourceKind::HdtFile), value: SourceValue::Path(path.into()) }
    }

    /// The URI, when this source is given by URI string.
    pub fn as_uri(&self) -> Option<&str> {
        match &self.value {
            SourceValue::Uri(uri) => Some(uri),
            SourceValue::Path(_) => None,
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match &self.value {
            SourceValue::Path(path) => Some(path),
            SourceValue::Uri(_) => None,
        }
    }
}

/// Immutable context passed along with every operation.
///
/// Setters return a modified copy; the source list is shared between copies.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    sources: Option<Arc<[DataSource]>>,
    router_passed: bool,
}

impl QueryContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_sources(&self, sources: Vec<DataSource>) -> Self {
        Self { sources: Some(sources.into()), ..self.clone() }
    }

    #[must_use]
    pub fn with_source(&self, source: DataSource) -> Self {
        self.with_sources(vec![source])
    }

    /// Marks the context as already handled by the router.
    ///
    /// Every context handed to a re-dispatched or fallback evaluation carries this
    /// marker, so the router never processes its own sub-evaluations again.
    #[must_use]
    pub fn with_router_passed(&self) -> Self {
        Self { router_passed: true, ..self.clone() }
    }

    pub fn sources(&self) -> Option<&[DataSource]> {
        self.sources.as_deref()
    }

    pub fn router_passed(&self) -> bool {
        self.router_passed
    }
}
