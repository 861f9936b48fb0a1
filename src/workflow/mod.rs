// SPDX-License-Identifier: MIT

//! Workflow engine
//!
//! - [`state`] - schema-checked, versioned state snapshots and merges
//! - [`registry`] - named step nodes
//! - [`graph`] - edge table, routers and the execution engine
//! - [`tasks`] - the generic agent steps workflows are assembled from
//! - [`loader`], [`types`], [`builder`] - YAML definitions into compiled graphs

pub mod builder;
pub mod condition;
pub mod graph;
pub mod loader;
pub mod registry;
pub mod state;
pub mod tasks;
pub mod types;

pub use builder::WorkflowBuilder;
pub use graph::{CompiledGraph, RunFailure, RunOptions, RunOutcome, StateGraph, END};
pub use loader::WorkflowLoader;
pub use types::WorkflowDefinition;
