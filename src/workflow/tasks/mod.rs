// SPDX-License-Identifier: MIT

//! Configurable task nodes
//!
//! Every agent in a workflow is one of four generic steps parameterized by
//! data: read a line of input, generate text from a template, validate text
//! into a [`Verdict`], or publish final artifacts.

mod input;
mod prompt;
mod publish;
mod validate;

pub use input::InputStep;
pub use prompt::PromptStep;
pub use publish::{Artifact, PublishStep};
pub use validate::ValidateStep;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::error::BoxError;
use crate::services::generator::{fill, Variables};
use crate::workflow::registry::Node;
use crate::workflow::state::{PartialState, State};

/// Outcome of a validation step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Approved,
    Rejected,
}

impl Verdict {
    /// Read the verdict from the first `approved` or `rejected` word of a reply.
    ///
    /// Words are compared case-insensitively with surrounding punctuation
    /// removed, so `Verdict: APPROVED` and `✅ **Approved**.` approve. A `not`
    /// directly before `approved` rejects. No verdict word at all rejects.
    pub fn from_reply(reply: &str) -> Self {
        let mut previous = String::new();
        for word in reply.split_whitespace() {
            let word = word
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            match word.as_str() {
                "approved" if previous != "not" => return Verdict::Approved,
                "approved" | "rejected" => return Verdict::Rejected,
                "" => {}
                _ => previous.clone_from(&word),
            }
        }
        Verdict::Rejected
    }

    /// Routing label written to state
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Approved => "approved",
            Verdict::Rejected => "rejected",
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Verdict::Approved)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fill `{field}` placeholders with the plain-text view of state fields
pub fn render_from_state(template: &str, state: &State) -> Result<String, BoxError> {
    fill(template, |name| state.render_text(name))
        .map_err(|name| BoxError::from(format!("template references unknown state field '{}'", name)))
}

/// Template variables taken from the named state fields
pub(crate) fn variables_from_state(
    state: &State,
    fields: &[String],
) -> Result<Variables, BoxError> {
    fields
        .iter()
        .map(|field| {
            state
                .render_text(field)
                .map(|text| (field.clone(), text))
                .ok_or_else(|| BoxError::from(format!("unknown state field '{}'", field)))
        })
        .collect()
}

/// Prints a progress line rendered from state before running the inner node
pub struct Announced {
    message: Option<String>,
    retry: Option<(String, String)>,
    inner: Arc<dyn Node>,
}

impl Announced {
    pub fn new(message: Option<&str>, inner: Arc<dyn Node>) -> Self {
        Self {
            message: message.map(str::to_string),
            retry: None,
            inner,
        }
    }

    /// Print `message` instead once `counter` is above zero; `{attempt}` is
    /// the attempt about to run
    pub fn with_retry(mut self, message: &str, counter: &str) -> Self {
        self.retry = Some((message.to_string(), counter.to_string()));
        self
    }

    fn line(&self, state: &State) -> Result<Option<String>, BoxError> {
        if let Some((message, counter)) = &self.retry {
            let done = state.integer(counter).unwrap_or(0);
            if done > 0 {
                let attempt = (done + 1).to_string();
                return fill(message, |name| {
                    if name == "attempt" {
                        Some(attempt.clone())
                    } else {
                        state.render_text(name)
                    }
                })
                .map(Some)
                .map_err(|name| {
                    BoxError::from(format!("template references unknown state field '{}'", name))
                });
            }
        }
        self.message
            .as_deref()
            .map(|message| render_from_state(message, state))
            .transpose()
    }
}

#[async_trait]
impl Node for Announced {
    async fn run(&self, state: &State) -> Result<PartialState, BoxError> {
        if let Some(line) = self.line(state)? {
            println!("{}", line);
        }
        self.inner.run(state).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::error::ServiceError;
    use crate::services::generator::{Generator, Variables};

    /// Replays replies per template and records every call
    #[derive(Default)]
    pub struct ScriptedGenerator {
        replies: Mutex<VecDeque<String>>,
        pub calls: Mutex<Vec<(String, Variables)>>,
    }

    impl ScriptedGenerator {
        pub fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        async fn generate(
            &self,
            template_id: &str,
            variables: &Variables,
        ) -> Result<String, ServiceError> {
            self.calls
                .lock()
                .unwrap()
                .push((template_id.to_string(), variables.clone()));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ServiceError::api("scripted", "no replies left"))
        }
    }
}
