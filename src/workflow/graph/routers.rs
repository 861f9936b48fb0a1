// SPDX-License-Identifier: MIT

//! Reusable routers for conditional edges

use serde_json::Value;

use super::edges::Router;
use crate::workflow::condition::{self, Expression};
use crate::workflow::state::State;

pub const RETRY: &str = "retry";
pub const PROCEED: &str = "proceed";

/// Bounded retry policy after a validation step.
///
/// Routes to `proceed` when the verdict field reads as approved, or when the
/// attempt counter has reached `max_attempts`; otherwise to `retry`. Once the
/// counter is at the cap this router never returns `retry`.
#[derive(Debug, Clone)]
pub struct RetryRouter {
    verdict_field: String,
    approved_value: String,
    counter_field: String,
    max_attempts: i64,
    retry_label: String,
    proceed_label: String,
    exhausted_notice: Option<String>,
}

impl RetryRouter {
    pub fn new(verdict_field: &str, counter_field: &str, max_attempts: i64) -> Self {
        Self {
            verdict_field: verdict_field.to_string(),
            approved_value: "approved".to_string(),
            counter_field: counter_field.to_string(),
            max_attempts,
            retry_label: RETRY.to_string(),
            proceed_label: PROCEED.to_string(),
            exhausted_notice: None,
        }
    }

    pub fn with_labels(mut self, retry: &str, proceed: &str) -> Self {
        self.retry_label = retry.to_string();
        self.proceed_label = proceed.to_string();
        self
    }

    /// Text value of the verdict field that counts as approval
    pub fn with_approved_value(mut self, value: &str) -> Self {
        self.approved_value = value.to_string();
        self
    }

    /// Line printed when the cap forces `proceed` without approval
    pub fn with_exhausted_notice(mut self, message: &str) -> Self {
        self.exhausted_notice = Some(message.to_string());
        self
    }

    pub fn retry_label(&self) -> &str {
        &self.retry_label
    }

    pub fn proceed_label(&self) -> &str {
        &self.proceed_label
    }

    pub fn max_attempts(&self) -> i64 {
        self.max_attempts
    }

    /// Boolean fields count when true, text fields when equal to the approved value
    pub fn is_approved(&self, state: &State) -> bool {
        match state.get(&self.verdict_field) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => *s == self.approved_value,
            _ => false,
        }
    }

    pub fn attempts(&self, state: &State) -> i64 {
        state.integer(&self.counter_field).unwrap_or(0)
    }
}

impl Router for RetryRouter {
    fn route(&self, state: &State) -> String {
        if self.is_approved(state) {
            return self.proceed_label.clone();
        }

        let attempts = self.attempts(state);
        if attempts >= self.max_attempts {
            log::warn!(
                "Maximum attempts reached ({}/{}) for '{}', proceeding without approval",
                attempts,
                self.max_attempts,
                self.counter_field
            );
            if let Some(notice) = &self.exhausted_notice {
                println!("{}", notice);
            }
            return self.proceed_label.clone();
        }

        log::info!(
            "'{}' not approved (attempt {}/{}), retrying",
            self.verdict_field,
            attempts,
            self.max_attempts
        );
        self.retry_label.clone()
    }
}

/// First matching rule wins; `default` otherwise
#[derive(Debug, Clone)]
pub struct ConditionRouter {
    rules: Vec<(Expression, String)>,
    default: String,
}

impl ConditionRouter {
    pub fn new(rules: Vec<(Expression, String)>, default: &str) -> Self {
        Self {
            rules,
            default: default.to_string(),
        }
    }
}

impl Router for ConditionRouter {
    fn route(&self, state: &State) -> String {
        self.rules
            .iter()
            .find(|(expr, _)| condition::evaluate(expr, state))
            .map(|(_, label)| label.clone())
            .unwrap_or_else(|| self.default.clone())
    }
}
