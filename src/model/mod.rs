// SPDX-License-Identifier: MIT

//! Model module - LLM model trait and shared message types
//!
//! Implementations live in submodules:
//! - [gemini] - Google's Gemini API

pub mod gemini;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Configuration for model generation
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Part {
    /// Regular text output from the model
    Text(String),
    /// Reasoning output from thinking models, never shown or sent back
    Thinking(String),
}

impl Content {
    pub fn system(text: impl Into<String>) -> Self {
        Self::text_with_role("system", text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::text_with_role("user", text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::text_with_role("model", text)
    }

    fn text_with_role(role: &str, text: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![Part::Text(text.into())],
        }
    }

    /// Concatenated text parts, thinking excluded
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::Thinking(_) => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Core trait for LLM model implementations
#[async_trait]
pub trait Model: Send + Sync {
    fn name(&self) -> &str;

    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
    ) -> Result<Content, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_text_skips_thinking() {
        let content = Content {
            role: "model".to_string(),
            parts: vec![
                Part::Thinking("let me see".to_string()),
                Part::Text("APPROVED".to_string()),
                Part::Text(" - all good".to_string()),
            ],
        };
        assert_eq!(content.text(), "APPROVED - all good");
    }

    #[test]
    fn test_content_constructors() {
        assert_eq!(Content::system("s").role, "system");
        assert_eq!(Content::user("u").role, "user");
        assert_eq!(Content::model("m").text(), "m");
    }
}
