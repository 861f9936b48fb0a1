// SPDX-License-Identifier: MIT

//! Condition expression evaluator

use super::ast::{CompareOp, Expression, Literal};
use crate::workflow::state::State;
use serde_json::Value;

/// Evaluate a condition expression against a state snapshot
pub fn evaluate(expr: &Expression, state: &State) -> bool {
    match expr {
        Expression::True => true,
        Expression::False => false,
        Expression::Compare { field, op, value } => {
            evaluate_compare(state.get_path(field), *op, value)
        }
        Expression::And(left, right) => evaluate(left, state) && evaluate(right, state),
        Expression::Or(left, right) => evaluate(left, state) || evaluate(right, state),
        Expression::Not(inner) => !evaluate(inner, state),
    }
}

fn evaluate_compare(left: Option<&Value>, op: CompareOp, right: &Literal) -> bool {
    match op {
        CompareOp::Eq => values_equal(left, right),
        CompareOp::NotEq => !values_equal(left, right),
        CompareOp::Gt => compare_numbers(left, right, |a, b| a > b),
        CompareOp::Gte => compare_numbers(left, right, |a, b| a >= b),
        CompareOp::Lt => compare_numbers(left, right, |a, b| a < b),
        CompareOp::Lte => compare_numbers(left, right, |a, b| a <= b),
        CompareOp::Contains => check_contains(left, right),
    }
}

fn values_equal(left: Option<&Value>, right: &Literal) -> bool {
    match (left, right) {
        (None, Literal::Null) | (Some(Value::Null), Literal::Null) => true,
        (Some(Value::String(s)), Literal::String(rs)) => s == rs,
        (Some(Value::Number(n)), Literal::Number(rn)) => n
            .as_f64()
            .map(|f| (f - rn).abs() < f64::EPSILON)
            .unwrap_or(false),
        (Some(Value::Bool(b)), Literal::Boolean(rb)) => b == rb,
        _ => false,
    }
}

fn compare_numbers<F>(left: Option<&Value>, right: &Literal, cmp: F) -> bool
where
    F: Fn(f64, f64) -> bool,
{
    match (left.and_then(|v| v.as_f64()), right) {
        (Some(f), Literal::Number(rn)) => cmp(f, *rn),
        _ => false,
    }
}

fn check_contains(left: Option<&Value>, right: &Literal) -> bool {
    match (left, right) {
        (Some(Value::String(s)), Literal::String(substr)) => s.contains(substr.as_str()),
        (Some(Value::Array(items)), literal) => items
            .iter()
            .any(|item| values_equal(Some(item), literal)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::condition::parse;
    use crate::workflow::state::{FieldType, Message, PartialState, StateSchema};
    use serde_json::json;
    use std::sync::Arc;

    fn state_with(update: PartialState) -> State {
        let schema = Arc::new(
            StateSchema::new()
                .append_field("messages", FieldType::Messages)
                .field("research_verdict", FieldType::Text)
                .field("research_approved", FieldType::Boolean)
                .field("research_attempts", FieldType::Integer)
                .field("interests", FieldType::TextList),
        );
        State::initialize(schema, &update).unwrap()
    }

    fn check(expr: &str, state: &State) -> bool {
        evaluate(&parse(expr).unwrap(), state)
    }

    #[test]
    fn test_string_equality() {
        let state = state_with(PartialState::new().set("research_verdict", "approved"));
        assert!(check("research_verdict == 'approved'", &state));
        assert!(!check("research_verdict == 'rejected'", &state));
        assert!(check("research_verdict != 'rejected'", &state));
    }

    #[test]
    fn test_integer_comparison() {
        let state = state_with(PartialState::new().set("research_attempts", 3));
        assert!(check("research_attempts >= 3", &state));
        assert!(!check("research_attempts > 3", &state));
        assert!(check("research_attempts == 3", &state));
        assert!(check("research_attempts <= 3.5", &state));
        assert!(!check("research_attempts < 3", &state));
    }

    #[test]
    fn test_boolean_comparison() {
        let state = state_with(PartialState::new().set("research_approved", true));
        assert!(check("research_approved == true", &state));
        assert!(!check("research_approved == false", &state));
    }

    #[test]
    fn test_missing_field_is_null() {
        let state = state_with(PartialState::new());
        assert!(check("nonexistent == null", &state));
        assert!(!check("nonexistent == 'value'", &state));
        assert!(!check("nonexistent > 1", &state));
    }

    #[test]
    fn test_contains_text_and_list() {
        let state = state_with(
            PartialState::new()
                .set("research_verdict", "rejected: missing price")
                .set("interests", json!(["spicy", "cheap"])),
        );
        assert!(check("research_verdict contains 'price'", &state));
        assert!(check("interests contains 'cheap'", &state));
        assert!(!check("interests contains 'vegan'", &state));
    }

    #[test]
    fn test_logical_operators() {
        let state = state_with(
            PartialState::new()
                .set("research_approved", false)
                .set("research_attempts", 3),
        );
        assert!(check(
            "research_approved == true or research_attempts >= 3",
            &state
        ));
        assert!(!check(
            "research_approved == true and research_attempts >= 3",
            &state
        ));
        assert!(check("not research_approved == true", &state));
    }

    #[test]
    fn test_nested_message_path() {
        let state = state_with(
            PartialState::new().set("messages", json!([Message::user("hi").to_value()])),
        );
        assert!(check("messages.0.role == 'user'", &state));
        assert!(check("messages.1.role == null", &state));
    }

    #[test]
    fn test_literal_true_false() {
        let state = state_with(PartialState::new());
        assert!(check("true", &state));
        assert!(!check("false", &state));
    }
}
