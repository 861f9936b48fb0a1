// SPDX-License-Identifier: MIT

//! Generation service - templated prompts sent to a model

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::ServiceError;
use crate::model::{Content, Model};

/// Template variables, by placeholder name
pub type Variables = HashMap<String, String>;

/// Call the generation service with a named template
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, template_id: &str, variables: &Variables)
        -> Result<String, ServiceError>;
}

/// A two-message chat prompt
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct PromptTemplate {
    pub system: String,
    pub human: String,
}

/// Named prompt templates
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(transparent)]
pub struct PromptLibrary {
    templates: BTreeMap<String, PromptTemplate>,
}

impl PromptLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: &str, system: &str, human: &str) {
        self.templates.insert(
            id.to_string(),
            PromptTemplate {
                system: system.to_string(),
                human: human.to_string(),
            },
        );
    }

    pub fn contains(&self, id: &str) -> bool {
        self.templates.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Result<&PromptTemplate, ServiceError> {
        self.templates
            .get(id)
            .ok_or_else(|| ServiceError::UnknownTemplate(id.to_string()))
    }

    /// Render a template into the system + user messages sent to the model
    pub fn render(&self, id: &str, variables: &Variables) -> Result<Vec<Content>, ServiceError> {
        let template = self.get(id)?;
        let lookup = |name: &str| variables.get(name).cloned();
        let missing = |variable: String| ServiceError::MissingVariable {
            template: id.to_string(),
            variable,
        };

        let system = fill(&template.system, lookup).map_err(missing)?;
        let human = fill(&template.human, lookup).map_err(missing)?;
        Ok(vec![Content::system(system), Content::user(human)])
    }
}

/// Replace `{name}` placeholders using `lookup`.
///
/// Only identifiers (`[A-Za-z0-9_]+`) between braces count as placeholders;
/// any other brace is kept verbatim. Returns the first unbound name as error.
pub fn fill<F>(text: &str, lookup: F) -> Result<String, String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after.find('}');
        let name = close.map(|c| &after[..c]);

        match name {
            Some(name)
                if !name.is_empty()
                    && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') =>
            {
                let value = lookup(name).ok_or_else(|| name.to_string())?;
                out.push_str(&value);
                rest = &after[name.len() + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

/// [`Generator`] backed by a [`Model`] and a [`PromptLibrary`]
pub struct ModelGenerator {
    model: Arc<dyn Model>,
    prompts: PromptLibrary,
}

impl ModelGenerator {
    pub fn new(model: Arc<dyn Model>, prompts: PromptLibrary) -> Self {
        Self { model, prompts }
    }
}

#[async_trait]
impl Generator for ModelGenerator {
    async fn generate(
        &self,
        template_id: &str,
        variables: &Variables,
    ) -> Result<String, ServiceError> {
        let history = self.prompts.render(template_id, variables)?;
        log::info!(
            "Generating '{}' with model {}",
            template_id,
            self.model.name()
        );
        let response = self
            .model
            .generate_content(&history, None)
            .await?;
        Ok(response.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GenerationConfig;
    use std::sync::Mutex;

    fn vars(pairs: &[(&str, &str)]) -> Variables {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_fill_replaces_placeholders() {
        let v = vars(&[("country", "Romania"), ("interests", "spicy, cheap")]);
        let out = fill("Best shaorma in {country} for: {interests}.", |n| {
            v.get(n).cloned()
        })
        .unwrap();
        assert_eq!(out, "Best shaorma in Romania for: spicy, cheap.");
    }

    #[test]
    fn test_fill_keeps_non_placeholder_braces() {
        let out = fill("json: {\"a\": 1} and {} and {x", |_| None).unwrap();
        assert_eq!(out, "json: {\"a\": 1} and {} and {x");
    }

    #[test]
    fn test_fill_reports_missing_variable() {
        let err = fill("Hello {name}", |_| None).unwrap_err();
        assert_eq!(err, "name");
    }

    #[test]
    fn test_render_unknown_template() {
        let library = PromptLibrary::new();
        assert!(matches!(
            library.render("nope", &Variables::new()),
            Err(ServiceError::UnknownTemplate(id)) if id == "nope"
        ));
    }

    #[test]
    fn test_render_missing_variable() {
        let mut library = PromptLibrary::new();
        library.insert("writing", "Write.", "Report on {research_findings}");
        assert!(matches!(
            library.render("writing", &Variables::new()),
            Err(ServiceError::MissingVariable { template, variable })
                if template == "writing" && variable == "research_findings"
        ));
    }

    struct RecordingModel {
        seen: Mutex<Vec<Content>>,
    }

    #[async_trait]
    impl Model for RecordingModel {
        fn name(&self) -> &str {
            "recording"
        }

        async fn generate_content(
            &self,
            history: &[Content],
            _config: Option<&GenerationConfig>,
        ) -> Result<Content, ServiceError> {
            self.seen.lock().unwrap().extend(history.iter().cloned());
            Ok(Content::model("generated"))
        }
    }

    #[tokio::test]
    async fn test_model_generator_sends_rendered_prompt() {
        let model = Arc::new(RecordingModel {
            seen: Mutex::new(Vec::new()),
        });
        let mut library = PromptLibrary::new();
        library.insert("research", "Research {country}.", "Go: {country}");

        let generator = ModelGenerator::new(model.clone(), library);
        let reply = generator
            .generate("research", &vars(&[("country", "Romania")]))
            .await
            .unwrap();

        assert_eq!(reply, "generated");
        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], Content::system("Research Romania."));
        assert_eq!(seen[1], Content::user("Go: Romania"));
    }
}
