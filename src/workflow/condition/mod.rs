// SPDX-License-Identifier: MIT

//! Condition expressions over workflow state
//!
//! Used by declarative routers. Expressions look like:
//! - `research_verdict == 'approved'`
//! - `research_attempts >= 3`
//! - `research_approved == true or research_attempts >= 3`
//! - `not (interests contains 'vegan')`

mod ast;
mod evaluator;
mod parser;

pub use ast::{CompareOp, Expression, Literal};
pub use evaluator::evaluate;
pub use parser::parse;
