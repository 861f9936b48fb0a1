// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::Arc;

use super::{variables_from_state, Verdict};
use crate::error::BoxError;
use crate::services::generator::Generator;
use crate::workflow::registry::Node;
use crate::workflow::state::{Message, PartialState, State};

pub const DEFAULT_REVIEW_PREFIX: &str = "Supervisor review: ";

/// Ask the generation service to review state and record a [`Verdict`].
///
/// The verdict is derived once, here; routers consume the stored label.
pub struct ValidateStep {
    generator: Arc<dyn Generator>,
    template: String,
    inputs: Vec<String>,
    verdict_field: String,
    approved_field: Option<String>,
    log: Option<String>,
    message_prefix: String,
}

impl ValidateStep {
    pub fn new(generator: Arc<dyn Generator>, template: &str, verdict_field: &str) -> Self {
        Self {
            generator,
            template: template.to_string(),
            inputs: Vec::new(),
            verdict_field: verdict_field.to_string(),
            approved_field: None,
            log: None,
            message_prefix: DEFAULT_REVIEW_PREFIX.to_string(),
        }
    }

    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    /// Boolean field mirroring the verdict
    pub fn with_approved_field(mut self, field: &str) -> Self {
        self.approved_field = Some(field.to_string());
        self
    }

    pub fn with_log(mut self, field: &str, prefix: Option<&str>) -> Self {
        self.log = Some(field.to_string());
        if let Some(prefix) = prefix {
            self.message_prefix = prefix.to_string();
        }
        self
    }
}

#[async_trait]
impl Node for ValidateStep {
    async fn run(&self, state: &State) -> Result<PartialState, BoxError> {
        let variables = variables_from_state(state, &self.inputs)?;
        let reply = self.generator.generate(&self.template, &variables).await?;
        let verdict = Verdict::from_reply(&reply);

        if verdict.is_approved() {
            println!("Review passed: findings approved");
        } else {
            println!("Review failed: findings rejected");
        }

        let mut update = PartialState::new().set(&self.verdict_field, verdict.label());
        if let Some(field) = &self.approved_field {
            update.insert(field, verdict.is_approved());
        }
        if let Some(log) = &self.log {
            let message = Message::assistant(format!("{}{}", self.message_prefix, reply));
            update.insert(log, message.to_value());
        }
        Ok(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::state::{FieldType, StateSchema};
    use crate::workflow::tasks::testing::ScriptedGenerator;

    fn state() -> State {
        let schema = Arc::new(
            StateSchema::new()
                .append_field("messages", FieldType::Messages)
                .field("research_findings", FieldType::Text)
                .field("research_verdict", FieldType::Text)
                .field("research_approved", FieldType::Boolean),
        );
        State::initialize(
            schema,
            &PartialState::new().set("research_findings", "Shaormeria X, 20 lei, Bucharest"),
        )
        .unwrap()
    }

    fn step(generator: Arc<ScriptedGenerator>) -> ValidateStep {
        ValidateStep::new(generator, "supervisor", "research_verdict")
            .with_inputs(["research_findings"])
            .with_approved_field("research_approved")
            .with_log("messages", None)
    }

    #[tokio::test]
    async fn test_validate_step_approves() {
        let generator = Arc::new(ScriptedGenerator::new(&["APPROVED"]));
        let before = state();
        let after = before
            .merge(&step(generator).run(&before).await.unwrap())
            .unwrap();

        assert_eq!(after.text("research_verdict"), Some("approved"));
        assert_eq!(after.boolean("research_approved"), Some(true));
        assert_eq!(
            after.messages("messages"),
            vec![Message::assistant("Supervisor review: APPROVED")]
        );
    }

    #[tokio::test]
    async fn test_validate_step_rejects() {
        let generator = Arc::new(ScriptedGenerator::new(&["REJECTED - no prices"]));
        let before = state();
        let after = before
            .merge(&step(generator.clone()).run(&before).await.unwrap())
            .unwrap();

        assert_eq!(after.text("research_verdict"), Some("rejected"));
        assert_eq!(after.boolean("research_approved"), Some(false));
        assert_eq!(
            generator.calls.lock().unwrap()[0].1["research_findings"],
            "Shaormeria X, 20 lei, Bucharest"
        );
    }
}
