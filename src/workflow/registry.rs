// SPDX-License-Identifier: MIT

//! Node registry - maps node names to step functions

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{BoxError, GraphError};
use crate::workflow::state::{PartialState, State};

/// A unit of work in the workflow graph.
///
/// Steps read the current snapshot and return only the fields they change.
/// Any I/O happens inside `run`; the engine never performs it.
#[async_trait]
pub trait Node: Send + Sync {
    async fn run(&self, state: &State) -> Result<PartialState, BoxError>;
}

/// Adapter for synchronous closures that never perform I/O
pub struct SyncNode<F> {
    func: F,
}

impl<F> SyncNode<F>
where
    F: Fn(&State) -> Result<PartialState, BoxError> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> Node for SyncNode<F>
where
    F: Fn(&State) -> Result<PartialState, BoxError> + Send + Sync,
{
    async fn run(&self, state: &State) -> Result<PartialState, BoxError> {
        (self.func)(state)
    }
}

/// Registry of named nodes, in registration order
#[derive(Clone, Default)]
pub struct NodeRegistry {
    nodes: HashMap<String, Arc<dyn Node>>,
    order: Vec<String>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, node: Arc<dyn Node>) -> Result<(), GraphError> {
        if self.nodes.contains_key(name) {
            return Err(GraphError::DuplicateNode(name.to_string()));
        }
        self.nodes.insert(name.to_string(), node);
        self.order.push(name.to_string());
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Node>, GraphError> {
        self.nodes
            .get(name)
            .cloned()
            .ok_or_else(|| GraphError::UnknownNode(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Node names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::state::{FieldType, StateSchema};

    struct Constant(&'static str);

    #[async_trait]
    impl Node for Constant {
        async fn run(&self, _state: &State) -> Result<PartialState, BoxError> {
            Ok(PartialState::new().set("out", self.0))
        }
    }

    fn state() -> State {
        let schema = Arc::new(StateSchema::new().field("out", FieldType::Text));
        State::initialize(schema, &PartialState::new()).unwrap()
    }

    #[tokio::test]
    async fn test_register_and_resolve() {
        let mut registry = NodeRegistry::new();
        registry.register("a", Arc::new(Constant("x"))).unwrap();

        let node = registry.resolve("a").unwrap();
        let update = node.run(&state()).await.unwrap();
        assert_eq!(update.get("out"), Some(&serde_json::json!("x")));
    }

    #[test]
    fn test_register_duplicate_fails() {
        let mut registry = NodeRegistry::new();
        registry.register("a", Arc::new(Constant("x"))).unwrap();

        let err = registry.register("a", Arc::new(Constant("y"))).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateNode(name) if name == "a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_resolve_unknown_fails() {
        let registry = NodeRegistry::new();
        assert!(matches!(
            registry.resolve("ghost"),
            Err(GraphError::UnknownNode(name)) if name == "ghost"
        ));
    }

    #[test]
    fn test_names_keep_registration_order() {
        let mut registry = NodeRegistry::new();
        for name in ["c", "a", "b"] {
            registry.register(name, Arc::new(Constant("x"))).unwrap();
        }
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_sync_node_adapter() {
        let node = SyncNode::new(|s: &State| {
            let current = s.text("out").unwrap_or_default().to_string();
            Ok(PartialState::new().set("out", format!("{}!", current)))
        });
        let update = node.run(&state()).await.unwrap();
        assert_eq!(update.get("out"), Some(&serde_json::json!("!")));
    }
}
