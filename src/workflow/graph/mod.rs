// SPDX-License-Identifier: MIT

//! Graph-based workflow construction and execution
//!
//! Build a [`StateGraph`], `compile()` it (structural validation happens
//! here, before any step runs), then run the [`CompiledGraph`].

mod edges;
pub mod executor;
mod routers;

pub use edges::{Edge, EdgeTable, EdgeView, Router, Topology, Transition, END};
pub use executor::{RunFailure, RunOptions, RunOutcome, TraceRecord};
pub use routers::{ConditionRouter, RetryRouter, PROCEED, RETRY};

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{GraphError, StateError};
use crate::workflow::registry::{Node, NodeRegistry};
use crate::workflow::state::{PartialState, State, StateSchema};

/// Mutable graph under construction
pub struct StateGraph {
    schema: Arc<StateSchema>,
    registry: NodeRegistry,
    edges: EdgeTable,
    entry: Option<String>,
    attempt_fields: HashMap<String, String>,
}

impl StateGraph {
    pub fn new(schema: StateSchema) -> Self {
        Self {
            schema: Arc::new(schema),
            registry: NodeRegistry::new(),
            edges: EdgeTable::new(),
            entry: None,
            attempt_fields: HashMap::new(),
        }
    }

    pub fn add_node(&mut self, name: &str, node: Arc<dyn Node>) -> Result<(), GraphError> {
        if name == END {
            return Err(GraphError::DuplicateNode(name.to_string()));
        }
        self.registry.register(name, node)
    }

    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<(), GraphError> {
        self.edges.set_unconditional(from, to)
    }

    pub fn add_conditional_edges<I, K, V>(
        &mut self,
        from: &str,
        router: Arc<dyn Router>,
        routes: I,
    ) -> Result<(), GraphError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.edges.set_conditional(from, router, routes)
    }

    pub fn set_entry_point(&mut self, name: &str) {
        self.entry = Some(name.to_string());
    }

    /// Report `field` as the attempt number of `node` in the run trace
    pub fn track_attempts(&mut self, node: &str, field: &str) {
        self.attempt_fields
            .insert(node.to_string(), field.to_string());
    }

    /// Validate schema and structure; no node is executed
    pub fn compile(self) -> Result<CompiledGraph, GraphError> {
        self.schema.validate()?;

        let entry = self
            .entry
            .ok_or_else(|| GraphError::MissingEntry(String::new()))?;
        self.edges.validate(&entry, END, &self.registry)?;

        for (node, field) in &self.attempt_fields {
            if !self.registry.contains(node) {
                return Err(GraphError::UnknownNode(node.clone()));
            }
            if self.schema.index_of(field).is_none() {
                return Err(StateError::UnknownField(field.clone()).into());
            }
        }

        log::debug!(
            "Compiled graph with {} nodes, entry '{}'",
            self.registry.len(),
            entry
        );

        Ok(CompiledGraph {
            schema: self.schema,
            registry: self.registry,
            edges: self.edges,
            entry,
            attempt_fields: self.attempt_fields,
        })
    }
}

/// Validated, immutable graph ready to run
pub struct CompiledGraph {
    schema: Arc<StateSchema>,
    registry: NodeRegistry,
    edges: EdgeTable,
    entry: String,
    attempt_fields: HashMap<String, String>,
}

impl CompiledGraph {
    /// Initial snapshot from caller-supplied values
    pub fn initial_state(&self, values: &PartialState) -> Result<State, StateError> {
        State::initialize(Arc::clone(&self.schema), values)
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn schema(&self) -> &StateSchema {
        &self.schema
    }

    pub fn edges(&self) -> &EdgeTable {
        &self.edges
    }

    pub fn topology(&self) -> Topology {
        Topology {
            entry: self.entry.clone(),
            nodes: self.registry.names().map(str::to_string).collect(),
            edges: self.edges.views(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::workflow::registry::SyncNode;
    use crate::workflow::state::FieldType;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn schema() -> StateSchema {
        StateSchema::new()
            .append_field("log", FieldType::TextList)
            .field("count", FieldType::Integer)
    }

    fn logging_node(name: &'static str) -> Arc<dyn Node> {
        Arc::new(SyncNode::new(move |s: &State| -> Result<PartialState, BoxError> {
            let count = s.integer("count").unwrap_or(0);
            Ok(PartialState::new()
                .set("log", name)
                .set("count", count + 1))
        }))
    }

    #[tokio::test]
    async fn test_linear_run_reaches_end() {
        let mut graph = StateGraph::new(schema());
        graph.add_node("a", logging_node("a")).unwrap();
        graph.add_node("b", logging_node("b")).unwrap();
        graph.add_edge("a", "b").unwrap();
        graph.add_edge("b", END).unwrap();
        graph.set_entry_point("a");

        let compiled = graph.compile().unwrap();
        let initial = compiled.initial_state(&PartialState::new()).unwrap();
        let outcome = compiled.run(initial).await.unwrap();

        assert_eq!(outcome.state.text_list("log").unwrap(), vec!["a", "b"]);
        assert_eq!(outcome.state.integer("count"), Some(2));
        assert_eq!(outcome.path(), vec!["a", "b"]);
        assert_eq!(outcome.trace[1].next, END);
        assert_eq!(outcome.state.version(), 2);
    }

    #[test]
    fn test_compile_without_entry_fails() {
        let mut graph = StateGraph::new(schema());
        graph.add_node("a", logging_node("a")).unwrap();
        graph.add_edge("a", END).unwrap();
        assert!(matches!(graph.compile(), Err(GraphError::MissingEntry(_))));
    }

    #[test]
    fn test_end_cannot_be_registered() {
        let mut graph = StateGraph::new(schema());
        assert!(graph.add_node(END, logging_node("x")).is_err());
    }

    #[test]
    fn test_track_attempts_requires_declared_field() {
        let mut graph = StateGraph::new(schema());
        graph.add_node("a", logging_node("a")).unwrap();
        graph.add_edge("a", END).unwrap();
        graph.set_entry_point("a");
        graph.track_attempts("a", "tries");

        assert!(matches!(
            graph.compile(),
            Err(GraphError::State(StateError::UnknownField(f))) if f == "tries"
        ));
    }

    #[tokio::test]
    async fn test_step_limit_stops_runaway_router() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut graph = StateGraph::new(schema());
        graph
            .add_node(
                "spin",
                Arc::new(SyncNode::new(move |_: &State| -> Result<PartialState, BoxError> {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(PartialState::new())
                })),
            )
            .unwrap();
        let always_again = |_: &State| "again".to_string();
        graph
            .add_conditional_edges("spin", Arc::new(always_again), [("again", "spin"), ("done", END)])
            .unwrap();
        graph.set_entry_point("spin");

        let compiled = graph.compile().unwrap();
        let initial = compiled.initial_state(&PartialState::new()).unwrap();
        let options = RunOptions {
            step_limit: Some(5),
            ..Default::default()
        };
        let failure = compiled.run_with(initial, options).await.unwrap_err();

        assert!(matches!(failure.error, GraphError::StepLimitExceeded(5)));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(failure.trace.len(), 5);
    }

    #[tokio::test]
    async fn test_cancelled_run_keeps_last_snapshot() {
        use tokio_util::sync::CancellationToken;

        let token = CancellationToken::new();
        let trigger = token.clone();

        let mut graph = StateGraph::new(schema());
        graph.add_node("a", logging_node("a")).unwrap();
        graph
            .add_node(
                "cancel",
                Arc::new(SyncNode::new(move |_: &State| -> Result<PartialState, BoxError> {
                    trigger.cancel();
                    Ok(PartialState::new().set("log", "cancel"))
                })),
            )
            .unwrap();
        graph.add_node("c", logging_node("c")).unwrap();
        graph.add_edge("a", "cancel").unwrap();
        graph.add_edge("cancel", "c").unwrap();
        graph.add_edge("c", END).unwrap();
        graph.set_entry_point("a");

        let compiled = graph.compile().unwrap();
        let initial = compiled.initial_state(&PartialState::new()).unwrap();
        let options = RunOptions {
            cancel: Some(token),
            ..Default::default()
        };
        let failure = compiled.run_with(initial, options).await.unwrap_err();

        assert!(matches!(failure.error, GraphError::Cancelled(ref n) if n == "c"));
        assert_eq!(
            failure.last_state.text_list("log").unwrap(),
            vec!["a", "cancel"]
        );
    }

    #[tokio::test]
    async fn test_snapshots_are_kept_when_requested() {
        let mut graph = StateGraph::new(schema());
        graph.add_node("a", logging_node("a")).unwrap();
        graph.add_edge("a", END).unwrap();
        graph.set_entry_point("a");

        let compiled = graph.compile().unwrap();
        let initial = compiled.initial_state(&PartialState::new()).unwrap();
        let options = RunOptions {
            keep_snapshots: true,
            ..Default::default()
        };
        let outcome = compiled.run_with(initial.clone(), options).await.unwrap();

        assert_eq!(outcome.snapshots.len(), 2);
        assert_eq!(outcome.snapshots[0], initial);
        assert_eq!(outcome.snapshots[1], outcome.state);
    }

    #[test]
    fn test_topology_lists_nodes_and_edges() {
        let mut graph = StateGraph::new(schema());
        graph.add_node("a", logging_node("a")).unwrap();
        graph.add_edge("a", END).unwrap();
        graph.set_entry_point("a");

        let topology = graph.compile().unwrap().topology();
        assert_eq!(topology.entry, "a");
        assert_eq!(topology.nodes, vec!["a"]);
        assert_eq!(topology.edges.len(), 1);
    }
}
