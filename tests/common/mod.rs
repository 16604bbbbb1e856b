//! In-process mock services shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use smartkg::core::{Bindings, EvaluationOutput, Operation, QueryContext};
use smartkg::services::{ByteStream, HttpFetcher, JoinService, QueryEvaluator};
use smartkg::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

pub const SOURCE: &str = "http://quantum.ex.org/watdiv";
pub const INDEX: &str = "http://quantum.ex.org/molecule/watdiv";

pub const SCENARIO_QUERY: &str = "SELECT * WHERE {
    ?x <http://ex.org/p1> ?y .
    ?x <http://ex.org/p2> ?z .
    ?w <http://ex.org/p3> ?x
}";

pub const SCENARIO_CATALOG: &str = r#"{
    "families": [
        { "name": "f1", "predicateSet": ["http://ex.org/p1", "http://ex.org/p2"],
          "grouped": true, "originalFamily": false }
    ],
    "infrequentPredicates": []
}"#;

/// Fresh, empty directory for one test, relative to the working directory.
pub fn test_dir(name: &str) -> PathBuf {
    let dir = PathBuf::from(format!("test_smartkg_{}", name));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

pub fn cleanup(dir: &PathBuf) {
    let _ = std::fs::remove_dir_all(dir);
}

/// Serves bodies from an in-memory map and counts every request.
#[derive(Default)]
pub struct MockFetcher {
    resources: Mutex<HashMap<String, Vec<u8>>>,
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::default() }
    }

    pub fn with_resource(self, uri: &str, body: impl Into<Vec<u8>>) -> Self {
        self.insert(uri, body);
        self
    }

    pub fn insert(&self, uri: &str, body: impl Into<Vec<u8>>) {
        self.resources.lock().unwrap().insert(uri.to_string(), body.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_to(&self, uri: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|call| call.as_str() == uri).count()
    }
}

#[async_trait]
impl HttpFetcher for MockFetcher {
    async fn fetch(&self, uri: &str, _context: &QueryContext) -> Result<ByteStream> {
        self.calls.lock().unwrap().push(uri.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let body = self.resources.lock().unwrap().get(uri).cloned().ok_or_else(|| Error::Fetch {
            uri: uri.to_string(),
            reason: "404 Not Found".to_string(),
        })?;

        // Two chunks, so tee-ing is exercised across chunk boundaries.
        let middle = body.len() / 2;
        let chunks: Vec<std::io::Result<Bytes>> = vec![
            Ok(Bytes::copy_from_slice(&body[..middle])),
            Ok(Bytes::copy_from_slice(&body[middle..])),
        ];
        Ok(stream::iter(chunks).boxed())
    }
}

/// Records every operation with its context.
///
/// Single patterns whose predicate is listed in `empty_predicates` report
/// `total_items = 0`; everything else reports one solution.
#[derive(Default)]
pub struct RecordingEvaluator {
    calls: Mutex<Vec<(Operation, QueryContext)>>,
    empty_predicates: HashSet<String>,
}

impl RecordingEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_empty_predicate(mut self, predicate: &str) -> Self {
        self.empty_predicates.insert(predicate.to_string());
        self
    }

    pub fn calls(&self) -> Vec<(Operation, QueryContext)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryEvaluator for RecordingEvaluator {
    async fn evaluate(
        &self,
        operation: Operation,
        context: QueryContext,
    ) -> Result<EvaluationOutput> {
        self.calls.lock().unwrap().push((operation.clone(), context));

        match &operation {
            Operation::Pattern(pattern) => {
                let empty = pattern
                    .predicate_iri()
                    .is_some_and(|predicate| self.empty_predicates.contains(predicate));
                if empty {
                    Ok(EvaluationOutput::empty())
                } else {
                    Ok(EvaluationOutput::from_bindings(pattern.variables(), vec![Bindings::new()]))
                }
            }
            Operation::Bgp(bgp) | Operation::AnnotatedBgp { bgp, .. } => {
                Ok(EvaluationOutput::from_bindings(bgp.variables(), vec![Bindings::new()]))
            }
        }
    }
}

/// Records the number of entries of every join and unions their variables.
#[derive(Default)]
pub struct RecordingJoin {
    joins: Mutex<Vec<usize>>,
}

impl RecordingJoin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn joins(&self) -> Vec<usize> {
        self.joins.lock().unwrap().clone()
    }
}

#[async_trait]
impl JoinService for RecordingJoin {
    async fn join(&self, entries: Vec<EvaluationOutput>) -> Result<EvaluationOutput> {
        self.joins.lock().unwrap().push(entries.len());
        let mut variables = Vec::new();
        for entry in entries {
            for variable in &entry.variables {
                if !variables.contains(variable) {
                    variables.push(variable.clone());
                }
            }
            entry.close();
        }
        Ok(EvaluationOutput::from_bindings(variables, vec![Bindings::new()]))
    }
}
