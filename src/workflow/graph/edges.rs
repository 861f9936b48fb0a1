// SPDX-License-Identifier: MIT

//! Edge table - successor resolution and structural validation

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::error::GraphError;
use crate::workflow::registry::NodeRegistry;
use crate::workflow::state::State;

/// Terminal marker: routing here ends the run
pub const END: &str = "__end__";

/// Maps the current state to a label selecting the next node.
///
/// Must be total over every reachable state; an undeclared label surfaces
/// as [`GraphError::Routing`].
pub trait Router: Send + Sync {
    fn route(&self, state: &State) -> String;
}

impl<F> Router for F
where
    F: Fn(&State) -> String + Send + Sync,
{
    fn route(&self, state: &State) -> String {
        self(state)
    }
}

/// Outgoing edge definition of a node
#[derive(Clone)]
pub enum Edge {
    Unconditional(String),
    Conditional {
        router: Arc<dyn Router>,
        routes: BTreeMap<String, String>,
    },
}

impl Edge {
    /// Every node name this edge may lead to
    pub fn targets(&self) -> Vec<&str> {
        match self {
            Edge::Unconditional(to) => vec![to.as_str()],
            Edge::Conditional { routes, .. } => routes.values().map(|s| s.as_str()).collect(),
        }
    }
}

/// Result of resolving the successor of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub to: String,
    /// Label returned by the router, for conditional edges
    pub label: Option<String>,
}

impl Transition {
    pub fn is_terminal(&self) -> bool {
        self.to == END
    }
}

/// Static view of one edge, for diagrams and listings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeView {
    pub from: String,
    pub to: String,
    pub label: Option<String>,
}

/// Static shape of a compiled graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub entry: String,
    pub nodes: Vec<String>,
    pub edges: Vec<EdgeView>,
}

#[derive(Clone, Default)]
pub struct EdgeTable {
    edges: HashMap<String, Edge>,
    order: Vec<String>,
}

impl EdgeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unconditional(&mut self, from: &str, to: &str) -> Result<(), GraphError> {
        self.insert(from, Edge::Unconditional(to.to_string()))
    }

    pub fn set_conditional<I, K, V>(
        &mut self,
        from: &str,
        router: Arc<dyn Router>,
        label_to_node: I,
    ) -> Result<(), GraphError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let routes: BTreeMap<String, String> = label_to_node
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.insert(from, Edge::Conditional { router, routes })
    }

    fn insert(&mut self, from: &str, edge: Edge) -> Result<(), GraphError> {
        if self.edges.contains_key(from) {
            return Err(GraphError::DuplicateEdge(from.to_string()));
        }
        self.edges.insert(from.to_string(), edge);
        self.order.push(from.to_string());
        Ok(())
    }

    pub fn get(&self, from: &str) -> Option<&Edge> {
        self.edges.get(from)
    }

    /// Resolve the successor of `from` given the post-merge state
    pub fn next(&self, from: &str, state: &State) -> Result<Transition, GraphError> {
        match self.edges.get(from) {
            None => Err(GraphError::MissingEdge(from.to_string())),
            Some(Edge::Unconditional(to)) => Ok(Transition {
                to: to.clone(),
                label: None,
            }),
            Some(Edge::Conditional { router, routes }) => {
                let label = router.route(state);
                match routes.get(&label) {
                    Some(to) => Ok(Transition {
                        to: to.clone(),
                        label: Some(label),
                    }),
                    None => Err(GraphError::Routing {
                        node: from.to_string(),
                        label,
                    }),
                }
            }
        }
    }

    /// Structural check of the static graph, ignoring router outcomes.
    ///
    /// Fails on an unregistered entry, edges touching unregistered nodes,
    /// nodes without an outgoing edge, and nodes with no path from `entry`.
    pub fn validate(
        &self,
        entry: &str,
        terminal: &str,
        registry: &NodeRegistry,
    ) -> Result<(), GraphError> {
        if !registry.contains(entry) {
            return Err(GraphError::MissingEntry(entry.to_string()));
        }

        for from in &self.order {
            if !registry.contains(from) {
                return Err(GraphError::UnknownNode(from.clone()));
            }
            let edge = &self.edges[from];
            if let Edge::Conditional { routes, .. } = edge {
                if routes.is_empty() {
                    return Err(GraphError::MissingEdge(from.clone()));
                }
            }
            for to in edge.targets() {
                if to != terminal && !registry.contains(to) {
                    return Err(GraphError::DanglingEdge {
                        from: from.clone(),
                        to: to.to_string(),
                    });
                }
            }
        }

        for name in registry.names() {
            if !self.edges.contains_key(name) {
                return Err(GraphError::MissingEdge(name.to_string()));
            }
        }

        let mut reached: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([entry]);
        while let Some(name) = queue.pop_front() {
            if name == terminal || !reached.insert(name) {
                continue;
            }
            if let Some(edge) = self.edges.get(name) {
                queue.extend(edge.targets());
            }
        }

        match registry.names().find(|name| !reached.contains(name)) {
            Some(unreachable) => Err(GraphError::UnreachableNode(unreachable.to_string())),
            None => Ok(()),
        }
    }

    /// Static edges in definition order
    pub fn views(&self) -> Vec<EdgeView> {
        self.order
            .iter()
            .flat_map(|from| match &self.edges[from] {
                Edge::Unconditional(to) => vec![EdgeView {
                    from: from.clone(),
                    to: to.clone(),
                    label: None,
                }],
                Edge::Conditional { routes, .. } => routes
                    .iter()
                    .map(|(label, to)| EdgeView {
                        from: from.clone(),
                        to: to.clone(),
                        label: Some(label.clone()),
                    })
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::workflow::registry::SyncNode;
    use crate::workflow::state::{FieldType, PartialState, StateSchema};

    fn registry(names: &[&str]) -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        for name in names {
            let node = SyncNode::new(|_: &State| -> Result<PartialState, BoxError> {
                Ok(PartialState::new())
            });
            registry.register(name, Arc::new(node)).unwrap();
        }
        registry
    }

    fn state(approved: bool) -> State {
        let schema = Arc::new(StateSchema::new().field("approved", FieldType::Boolean));
        State::initialize(schema, &PartialState::new().set("approved", approved)).unwrap()
    }

    fn approval_router(state: &State) -> String {
        if state.boolean("approved") == Some(true) {
            "yes".to_string()
        } else {
            "no".to_string()
        }
    }

    #[test]
    fn test_unconditional_next_ignores_state() {
        let mut table = EdgeTable::new();
        table.set_unconditional("a", "b").unwrap();

        for approved in [true, false] {
            let t = table.next("a", &state(approved)).unwrap();
            assert_eq!(t.to, "b");
            assert_eq!(t.label, None);
        }
    }

    #[test]
    fn test_conditional_next_uses_router() {
        let mut table = EdgeTable::new();
        table
            .set_conditional("check", Arc::new(approval_router), [("yes", "write"), ("no", "research")])
            .unwrap();

        let t = table.next("check", &state(true)).unwrap();
        assert_eq!(t.to, "write");
        assert_eq!(t.label.as_deref(), Some("yes"));

        let t = table.next("check", &state(false)).unwrap();
        assert_eq!(t.to, "research");
    }

    #[test]
    fn test_undeclared_label_is_routing_error() {
        let mut table = EdgeTable::new();
        table
            .set_conditional("check", Arc::new(approval_router), [("yes", "write")])
            .unwrap();

        let err = table.next("check", &state(false)).unwrap_err();
        assert!(matches!(
            err,
            GraphError::Routing { node, label } if node == "check" && label == "no"
        ));
    }

    #[test]
    fn test_second_edge_definition_rejected() {
        let mut table = EdgeTable::new();
        table.set_unconditional("a", "b").unwrap();
        let err = table
            .set_conditional("a", Arc::new(approval_router), [("yes", "b")])
            .unwrap_err();
        assert!(matches!(err, GraphError::DuplicateEdge(n) if n == "a"));
    }

    #[test]
    fn test_validate_accepts_retry_cycle() {
        let mut table = EdgeTable::new();
        table.set_unconditional("research", "check").unwrap();
        table
            .set_conditional("check", Arc::new(approval_router), [("yes", "write"), ("no", "research")])
            .unwrap();
        table.set_unconditional("write", END).unwrap();

        let registry = registry(&["research", "check", "write"]);
        assert!(table.validate("research", END, &registry).is_ok());
    }

    #[test]
    fn test_validate_dangling_edge() {
        let mut table = EdgeTable::new();
        table.set_unconditional("a", "ghost").unwrap();

        let err = table.validate("a", END, &registry(&["a"])).unwrap_err();
        assert!(matches!(
            err,
            GraphError::DanglingEdge { from, to } if from == "a" && to == "ghost"
        ));
    }

    #[test]
    fn test_validate_unreachable_node() {
        let mut table = EdgeTable::new();
        table.set_unconditional("a", END).unwrap();
        table.set_unconditional("island", END).unwrap();

        let err = table
            .validate("a", END, &registry(&["a", "island"]))
            .unwrap_err();
        assert!(matches!(err, GraphError::UnreachableNode(n) if n == "island"));
    }

    #[test]
    fn test_validate_missing_edge_and_entry() {
        let table = EdgeTable::new();
        assert!(matches!(
            table.validate("a", END, &registry(&["a"])),
            Err(GraphError::MissingEdge(n)) if n == "a"
        ));
        assert!(matches!(
            table.validate("nope", END, &registry(&["a"])),
            Err(GraphError::MissingEntry(n)) if n == "nope"
        ));
    }

    #[test]
    fn test_views_expand_conditional_routes() {
        let mut table = EdgeTable::new();
        table.set_unconditional("a", "check").unwrap();
        table
            .set_conditional("check", Arc::new(approval_router), [("yes", END), ("no", "a")])
            .unwrap();

        let views = table.views();
        assert_eq!(views.len(), 3);
        assert_eq!(views[0].label, None);
        assert_eq!(views[1].label.as_deref(), Some("no"));
        assert_eq!(views[2].to, END);
    }
}
