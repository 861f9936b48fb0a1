// SPDX-License-Identifier: MIT

//! Typed error handling for research-graph
//!
//! Construction-time defects (`StateError`, most `GraphError` variants,
//! `DefinitionError`) are fatal before any step runs. Run-time failures
//! (`GraphError::Step`, `GraphError::Routing`) abort the run.

use thiserror::Error;

/// Boxed error returned across the step-function boundary
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// State container errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StateError {
    /// A value references a field the schema does not declare
    #[error("Unknown state field '{0}'")]
    UnknownField(String),

    /// A value's shape disagrees with the declared field type
    #[error("Type mismatch for field '{field}': expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: String,
    },

    /// A schema declares the same field twice or an invalid reducer
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
}

/// Graph construction and execution errors
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Node '{0}' is already registered")]
    DuplicateNode(String),

    #[error("Node '{0}' is not registered")]
    UnknownNode(String),

    #[error("Node '{0}' already has an outgoing edge")]
    DuplicateEdge(String),

    #[error("Entry point '{0}' is not set or not registered")]
    MissingEntry(String),

    #[error("Node '{0}' has no outgoing edge")]
    MissingEdge(String),

    #[error("Edge from '{from}' references unregistered node '{to}'")]
    DanglingEdge { from: String, to: String },

    #[error("Node '{0}' is unreachable from the entry point")]
    UnreachableNode(String),

    #[error("Router on '{node}' returned undeclared label '{label}'")]
    Routing { node: String, label: String },

    #[error("Step '{node}' failed: {source}")]
    Step {
        node: String,
        #[source]
        source: BoxError,
    },

    /// A step's update was rejected by the state schema
    #[error("Step '{node}' produced an invalid update: {source}")]
    Merge {
        node: String,
        #[source]
        source: StateError,
    },

    #[error("Run cancelled before node '{0}'")]
    Cancelled(String),

    #[error("Step limit of {0} reached")]
    StepLimitExceeded(usize),

    #[error(transparent)]
    State(#[from] StateError),
}

/// Generation service errors
#[derive(Debug, Error)]
pub enum ServiceError {
    /// API key not configured
    #[error("API key not configured for provider: {0}")]
    ApiKeyMissing(String),

    /// Non-success response from the provider
    #[error("API error from {provider}: {message}")]
    Api { provider: String, message: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Response body did not carry generated text
    #[error("Invalid response from model: {0}")]
    InvalidResponse(String),

    #[error("Unknown prompt template '{0}'")]
    UnknownTemplate(String),

    #[error("Template '{template}' references unbound variable '{variable}'")]
    MissingVariable { template: String, variable: String },
}

/// Interactive input errors
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Input stream closed while waiting for: {0}")]
    Closed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Workflow definition errors
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid condition '{expression}': {message}")]
    Condition { expression: String, message: String },

    #[error("Node '{node}': {message}")]
    Node { node: String, message: String },

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl ServiceError {
    /// Create an API error
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

impl DefinitionError {
    pub fn node(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Node {
            node: node.into(),
            message: message.into(),
        }
    }
}

impl GraphError {
    /// Name of the node the error points at, when there is one
    pub fn node(&self) -> Option<&str> {
        match self {
            GraphError::Step { node, .. }
            | GraphError::Merge { node, .. }
            | GraphError::Routing { node, .. } => Some(node),
            GraphError::Cancelled(node) => Some(node),
            _ => None,
        }
    }
}
