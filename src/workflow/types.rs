// SPDX-License-Identifier: MIT

//! YAML schema types for workflow definitions
//!
//! A definition carries the state schema, the prompt templates, the nodes
//! (each one generic task step configured by data) and the edges.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::services::generator::PromptLibrary;
use crate::workflow::state::{Message, PartialState, StateSchema};
use crate::workflow::tasks::Artifact;

/// Top-level workflow definition
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WorkflowDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Ordered state schema
    pub state: StateSchema,
    #[serde(default)]
    pub prompts: PromptLibrary,
    /// First node to run
    pub entry: String,
    /// Messages field seeded with the caller's free-text request
    #[serde(default)]
    pub request_field: Option<String>,
    /// Boolean field reporting whether validation passed, checked after a run
    #[serde(default)]
    pub approval_field: Option<String>,
    pub nodes: Vec<NodeDefinition>,
    pub edges: Vec<EdgeDefinition>,
}

impl WorkflowDefinition {
    /// Initial values for a run started with `request`
    pub fn initial_values(&self, request: &str) -> PartialState {
        let mut values = PartialState::new();
        if let Some(field) = &self.request_field {
            values.insert(field, Value::Array(vec![Message::user(request).to_value()]));
        }
        values
    }
}

/// A node in the workflow
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NodeDefinition {
    /// Unique node identifier
    pub id: String,
    /// Progress line printed before the step runs; may use `{field}`
    #[serde(default)]
    pub announce: Option<String>,
    /// Printed instead of `announce` once the step's counter is above zero;
    /// `{attempt}` is the attempt about to run
    #[serde(default)]
    pub retry_announce: Option<String>,
    #[serde(flatten)]
    pub step: StepDefinition,
}

/// Step configuration, selected by `kind`
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepDefinition {
    Input {
        prompt: String,
        output: String,
        /// Separator for list answers
        #[serde(default)]
        split: Option<String>,
        #[serde(default)]
        log: Option<String>,
    },
    Generate {
        template: String,
        #[serde(default)]
        inputs: Vec<String>,
        output: String,
        #[serde(default)]
        log: Option<String>,
        #[serde(default)]
        message_prefix: String,
        /// Integer field incremented on every run
        #[serde(default)]
        counter: Option<String>,
        /// Fields overwritten on every run
        #[serde(default)]
        reset: BTreeMap<String, Value>,
        #[serde(default)]
        compose: Option<ComposeDefinition>,
    },
    Validate {
        template: String,
        #[serde(default)]
        inputs: Vec<String>,
        /// Text field receiving the verdict label
        verdict: String,
        #[serde(default)]
        approved: Option<String>,
        #[serde(default)]
        log: Option<String>,
        #[serde(default)]
        message_prefix: Option<String>,
    },
    Publish {
        display: String,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        artifacts: Vec<Artifact>,
    },
}

/// Derived field written from a template over state plus `{output}`
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ComposeDefinition {
    pub field: String,
    pub template: String,
}

/// Outgoing edge of one node: either `to` or `router` + `routes`
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EdgeDefinition {
    pub from: String,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub router: Option<RouterDefinition>,
    /// Router label to target node
    #[serde(default)]
    pub routes: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouterDefinition {
    /// Bounded retry on a validation verdict
    Retry {
        verdict: String,
        counter: String,
        max_attempts: i64,
        #[serde(default)]
        approved_value: Option<String>,
        /// Printed when the cap forces the workflow forward
        #[serde(default)]
        exhausted_announce: Option<String>,
    },
    /// First matching condition wins
    Condition {
        rules: Vec<RuleDefinition>,
        default: String,
    },
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RuleDefinition {
    pub when: String,
    pub route: String,
}
