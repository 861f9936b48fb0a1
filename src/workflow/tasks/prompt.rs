// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::variables_from_state;
use crate::error::BoxError;
use crate::services::generator::{fill, Generator};
use crate::workflow::registry::Node;
use crate::workflow::state::{Message, PartialState, State};

/// Call the generation service with one template and store the reply
pub struct PromptStep {
    generator: Arc<dyn Generator>,
    template: String,
    inputs: Vec<String>,
    output: String,
    log: Option<String>,
    message_prefix: String,
    counter: Option<String>,
    reset: Vec<(String, Value)>,
    compose: Option<(String, String)>,
}

impl PromptStep {
    pub fn new(generator: Arc<dyn Generator>, template: &str, output: &str) -> Self {
        Self {
            generator,
            template: template.to_string(),
            inputs: Vec::new(),
            output: output.to_string(),
            log: None,
            message_prefix: String::new(),
            counter: None,
            reset: Vec::new(),
            compose: None,
        }
    }

    /// State fields passed to the template as variables of the same name
    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    /// Append the reply as an assistant message to `field`
    pub fn with_log(mut self, field: &str, prefix: &str) -> Self {
        self.log = Some(field.to_string());
        self.message_prefix = prefix.to_string();
        self
    }

    /// Increment an integer field on every run
    pub fn with_counter(mut self, field: &str) -> Self {
        self.counter = Some(field.to_string());
        self
    }

    /// Overwrite `field` with `value` on every run
    pub fn with_reset(mut self, field: &str, value: Value) -> Self {
        self.reset.push((field.to_string(), value));
        self
    }

    /// Also write `template` into `field`; `{output}` stands for the reply
    pub fn with_compose(mut self, field: &str, template: &str) -> Self {
        self.compose = Some((field.to_string(), template.to_string()));
        self
    }
}

#[async_trait]
impl Node for PromptStep {
    async fn run(&self, state: &State) -> Result<PartialState, BoxError> {
        let variables = variables_from_state(state, &self.inputs)?;
        let reply = self.generator.generate(&self.template, &variables).await?;

        let mut update = PartialState::new().set(&self.output, reply.as_str());

        if let Some(counter) = &self.counter {
            let attempt = state.integer(counter).unwrap_or(0) + 1;
            update.insert(counter, attempt);
        }
        for (field, value) in &self.reset {
            update.insert(field, value.clone());
        }
        if let Some((field, template)) = &self.compose {
            let composed = fill(template, |name| {
                if name == "output" {
                    Some(reply.clone())
                } else {
                    state.render_text(name)
                }
            })
            .map_err(|name| BoxError::from(format!("unknown field '{}' in compose", name)))?;
            update.insert(field, composed);
        }
        if let Some(log) = &self.log {
            let message = Message::assistant(format!("{}{}", self.message_prefix, reply));
            update.insert(log, message.to_value());
        }

        Ok(update)
    }
}
