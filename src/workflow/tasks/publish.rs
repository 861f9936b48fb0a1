// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::render_from_state;
use crate::error::BoxError;
use crate::services::artifacts::ArtifactWriter;
use crate::workflow::registry::Node;
use crate::workflow::state::{PartialState, State};

/// One file written by [`PublishStep`]
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Artifact {
    pub path: String,
    /// Content template over state fields, e.g. `"{final_report}"`
    pub content: String,
}

/// Display the final report and write the run's artifacts.
///
/// Changes no state.
pub struct PublishStep {
    writer: Arc<dyn ArtifactWriter>,
    display: String,
    title: String,
    artifacts: Vec<Artifact>,
}

impl PublishStep {
    pub fn new(writer: Arc<dyn ArtifactWriter>, display: &str) -> Self {
        Self {
            writer,
            display: display.to_string(),
            title: "FINAL REPORT".to_string(),
            artifacts: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn with_artifact(mut self, path: &str, content: &str) -> Self {
        self.artifacts.push(Artifact {
            path: path.to_string(),
            content: content.to_string(),
        });
        self
    }
}

#[async_trait]
impl Node for PublishStep {
    async fn run(&self, state: &State) -> Result<PartialState, BoxError> {
        let rule = "=".repeat(60);
        let body = state
            .render_text(&self.display)
            .ok_or_else(|| BoxError::from(format!("unknown state field '{}'", self.display)))?;

        println!("\n{}\n{}\n{}", rule, self.title, rule);
        println!("{}", body);
        println!("\n{}", rule);

        for artifact in &self.artifacts {
            let content = render_from_state(&artifact.content, state)?;
            self.writer.write_text(&artifact.path, &content).await?;
            println!("Saved '{}'", artifact.path);
        }

        Ok(PartialState::new())
    }
}
