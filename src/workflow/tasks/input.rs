// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::render_from_state;
use crate::error::BoxError;
use crate::services::input::LineReader;
use crate::workflow::registry::Node;
use crate::workflow::state::{Message, PartialState, State};

/// Ask the user one question and store the answer
pub struct InputStep {
    reader: Arc<dyn LineReader>,
    prompt: String,
    output: String,
    split: Option<String>,
    log: Option<String>,
}

impl InputStep {
    /// `prompt` may reference state fields as `{field}`
    pub fn new(reader: Arc<dyn LineReader>, prompt: &str, output: &str) -> Self {
        Self {
            reader,
            prompt: prompt.to_string(),
            output: output.to_string(),
            split: None,
            log: None,
        }
    }

    /// Store a list: items separated by `separator`, trimmed, empties dropped
    pub fn with_split(mut self, separator: &str) -> Self {
        self.split = Some(separator.to_string());
        self
    }

    /// Append the raw answer as a user message to `field`
    pub fn with_log(mut self, field: &str) -> Self {
        self.log = Some(field.to_string());
        self
    }
}

#[async_trait]
impl Node for InputStep {
    async fn run(&self, state: &State) -> Result<PartialState, BoxError> {
        let prompt = render_from_state(&self.prompt, state)?;
        let line = self.reader.read_line(&prompt).await?;

        let value = match &self.split {
            Some(separator) => Value::Array(
                line.split(separator.as_str())
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(|item| Value::String(item.to_string()))
                    .collect(),
            ),
            None => Value::String(line.trim().to_string()),
        };

        let mut update = PartialState::new().set(&self.output, value);
        if let Some(log) = &self.log {
            update.insert(log, Message::user(line).to_value());
        }
        Ok(update)
    }
}
