// SPDX-License-Identifier: MIT

//! State management for graph workflows
//!
//! This module provides:
//! - `StateSchema` - the fixed, ordered set of typed fields a workflow threads through
//! - `State` - an immutable snapshot; every merge yields a new one
//! - `PartialState` - the subset of fields a step intends to change

mod schema;
mod store;

pub use schema::{FieldType, Message, ReducerType, StateFieldDef, StateSchema};
pub use store::{PartialState, State};
