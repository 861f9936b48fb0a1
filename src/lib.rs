// SPDX-License-Identifier: MIT

//! Graph-driven multi-agent research assistant.
//!
//! - [`workflow`] - state container, node registry, edge table and execution engine
//! - [`services`] - narrow interfaces to the generation service, terminal, files and diagrams
//! - [`model`] - LLM model trait and the Gemini backend

pub mod config;
pub mod error;
pub mod model;
pub mod services;
pub mod workflow;
