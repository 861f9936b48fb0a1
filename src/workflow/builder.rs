// SPDX-License-Identifier: MIT

//! Workflow builder - turns a definition into a compiled graph
//!
//! Every field, template and placeholder a node refers to is checked here,
//! so a broken definition fails before any service is called.

use std::sync::Arc;

use crate::error::DefinitionError;
use crate::services::generator::{fill, PromptLibrary};
use crate::services::Collaborators;
use crate::workflow::condition;
use crate::workflow::graph::{
    CompiledGraph, ConditionRouter, RetryRouter, Router, StateGraph, END,
};
use crate::workflow::registry::Node;
use crate::workflow::state::{FieldType, StateSchema};
use crate::workflow::tasks::{Announced, InputStep, PromptStep, PublishStep, ValidateStep};
use crate::workflow::types::{
    EdgeDefinition, NodeDefinition, RouterDefinition, StepDefinition, WorkflowDefinition,
};

/// Builds executable graphs from [`WorkflowDefinition`]s
pub struct WorkflowBuilder {
    services: Collaborators,
}

impl WorkflowBuilder {
    pub fn new(services: Collaborators) -> Self {
        Self { services }
    }

    pub fn build(&self, def: &WorkflowDefinition) -> Result<CompiledGraph, DefinitionError> {
        def.state.validate()?;
        if let Some(field) = &def.request_field {
            expect_field(&def.state, "request_field", field, Some(FieldType::Messages))?;
        }
        if let Some(field) = &def.approval_field {
            expect_field(&def.state, "approval_field", field, Some(FieldType::Boolean))?;
        }

        let mut graph = StateGraph::new(def.state.clone());

        for node_def in &def.nodes {
            let counter = match &node_def.step {
                StepDefinition::Generate { counter, .. } => counter.as_deref(),
                _ => None,
            };
            let node = self.build_node(def, node_def)?;
            let node = announce(&def.state, node_def, counter, node)?;
            graph.add_node(&node_def.id, node)?;

            if let Some(counter) = counter {
                graph.track_attempts(&node_def.id, counter);
            }
        }

        for edge in &def.edges {
            self.add_edge(&mut graph, &def.state, edge)?;
        }

        graph.set_entry_point(&def.entry);
        let compiled = graph.compile()?;
        log::info!(
            "Built workflow '{}' with {} nodes",
            def.name,
            def.nodes.len()
        );
        Ok(compiled)
    }

    fn build_node(
        &self,
        def: &WorkflowDefinition,
        node_def: &NodeDefinition,
    ) -> Result<Arc<dyn Node>, DefinitionError> {
        let id = node_def.id.as_str();
        let schema = &def.state;

        let node: Arc<dyn Node> = match &node_def.step {
            StepDefinition::Input {
                prompt,
                output,
                split,
                log,
            } => {
                check_placeholders(schema, id, prompt)?;
                let output_type = if split.is_some() {
                    FieldType::TextList
                } else {
                    FieldType::Text
                };
                expect_field(schema, id, output, Some(output_type))?;

                let mut step = InputStep::new(self.services.reader.clone(), prompt, output);
                if let Some(separator) = split {
                    step = step.with_split(separator);
                }
                if let Some(log) = log {
                    expect_field(schema, id, log, Some(FieldType::Messages))?;
                    step = step.with_log(log);
                }
                Arc::new(step)
            }
            StepDefinition::Generate {
                template,
                inputs,
                output,
                log,
                message_prefix,
                counter,
                reset,
                compose,
            } => {
                check_template(&def.prompts, id, template, inputs)?;
                for input in inputs {
                    expect_field(schema, id, input, None)?;
                }
                expect_field(schema, id, output, Some(FieldType::Text))?;

                let mut step = PromptStep::new(self.services.generator.clone(), template, output)
                    .with_inputs(inputs.iter().cloned());
                if let Some(log) = log {
                    expect_field(schema, id, log, Some(FieldType::Messages))?;
                    step = step.with_log(log, message_prefix);
                }
                if let Some(counter) = counter {
                    expect_field(schema, id, counter, Some(FieldType::Integer))?;
                    step = step.with_counter(counter);
                }
                for (field, value) in reset {
                    let field_type = expect_field(schema, id, field, None)?;
                    if !field_type.accepts(value) {
                        return Err(DefinitionError::node(
                            id,
                            format!("reset value {} does not fit {} field '{}'", value, field_type, field),
                        ));
                    }
                    step = step.with_reset(field, value.clone());
                }
                if let Some(compose) = compose {
                    expect_field(schema, id, &compose.field, Some(FieldType::Text))?;
                    check_compose(schema, id, &compose.template)?;
                    step = step.with_compose(&compose.field, &compose.template);
                }
                Arc::new(step)
            }
            StepDefinition::Validate {
                template,
                inputs,
                verdict,
                approved,
                log,
                message_prefix,
            } => {
                check_template(&def.prompts, id, template, inputs)?;
                for input in inputs {
                    expect_field(schema, id, input, None)?;
                }
                expect_field(schema, id, verdict, Some(FieldType::Text))?;

                let mut step = ValidateStep::new(self.services.generator.clone(), template, verdict)
                    .with_inputs(inputs.iter().cloned());
                if let Some(approved) = approved {
                    expect_field(schema, id, approved, Some(FieldType::Boolean))?;
                    step = step.with_approved_field(approved);
                }
                if let Some(log) = log {
                    expect_field(schema, id, log, Some(FieldType::Messages))?;
                    step = step.with_log(log, message_prefix.as_deref());
                }
                Arc::new(step)
            }
            StepDefinition::Publish {
                display,
                title,
                artifacts,
            } => {
                expect_field(schema, id, display, None)?;
                let mut step = PublishStep::new(self.services.writer.clone(), display);
                if let Some(title) = title {
                    step = step.with_title(title);
                }
                for artifact in artifacts {
                    check_placeholders(schema, id, &artifact.content)?;
                    step = step.with_artifact(&artifact.path, &artifact.content);
                }
                Arc::new(step)
            }
        };

        Ok(node)
    }

    fn add_edge(
        &self,
        graph: &mut StateGraph,
        schema: &StateSchema,
        edge: &EdgeDefinition,
    ) -> Result<(), DefinitionError> {
        match (&edge.to, &edge.router) {
            (Some(to), None) => {
                graph.add_edge(&edge.from, target(to))?;
            }
            (None, Some(router_def)) => {
                let router = build_router(schema, &edge.from, router_def)?;
                let routes = edge
                    .routes
                    .iter()
                    .map(|(label, to)| (label.clone(), target(to).to_string()));
                graph.add_conditional_edges(&edge.from, router, routes)?;
            }
            _ => {
                return Err(DefinitionError::node(
                    &edge.from,
                    "an edge needs exactly one of 'to' or 'router'",
                ))
            }
        }
        Ok(())
    }
}

/// `END` in definitions names the terminal marker
fn target(name: &str) -> &str {
    if name == "END" {
        END
    } else {
        name
    }
}

fn build_router(
    schema: &StateSchema,
    from: &str,
    def: &RouterDefinition,
) -> Result<Arc<dyn Router>, DefinitionError> {
    match def {
        RouterDefinition::Retry {
            verdict,
            counter,
            max_attempts,
            approved_value,
            exhausted_announce,
        } => {
            expect_field(schema, from, verdict, None)?;
            expect_field(schema, from, counter, Some(FieldType::Integer))?;
            if *max_attempts < 1 {
                return Err(DefinitionError::node(from, "max_attempts must be at least 1"));
            }

            let mut router = RetryRouter::new(verdict, counter, *max_attempts);
            if let Some(value) = approved_value {
                router = router.with_approved_value(value);
            }
            if let Some(message) = exhausted_announce {
                router = router.with_exhausted_notice(message);
            }
            Ok(Arc::new(router))
        }
        RouterDefinition::Condition { rules, default } => {
            let rules = rules
                .iter()
                .map(|rule| -> Result<_, DefinitionError> {
                    Ok((condition::parse(&rule.when)?, rule.route.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Arc::new(ConditionRouter::new(rules, default)))
        }
    }
}

/// Look up `field`, optionally requiring a type; returns the declared type
fn expect_field(
    schema: &StateSchema,
    node: &str,
    field: &str,
    expected: Option<FieldType>,
) -> Result<FieldType, DefinitionError> {
    let def = schema
        .get(field)
        .ok_or_else(|| DefinitionError::node(node, format!("unknown state field '{}'", field)))?;

    match expected {
        Some(expected) if expected != def.field_type => Err(DefinitionError::node(
            node,
            format!(
                "field '{}' is {}, expected {}",
                field, def.field_type, expected
            ),
        )),
        _ => Ok(def.field_type),
    }
}

/// The template exists and every placeholder is one of `inputs`
fn check_template(
    prompts: &PromptLibrary,
    node: &str,
    template: &str,
    inputs: &[String],
) -> Result<(), DefinitionError> {
    let prompt = prompts
        .get(template)
        .map_err(|e| DefinitionError::node(node, e.to_string()))?;

    let bound = |name: &str| inputs.iter().any(|i| i == name).then(String::new);
    for text in [&prompt.system, &prompt.human] {
        fill(text, bound).map_err(|name| {
            DefinitionError::node(
                node,
                format!("template '{}' uses '{{{}}}' which is not an input", template, name),
            )
        })?;
    }
    Ok(())
}

/// Wrap `node` so it prints its progress lines
fn announce(
    schema: &StateSchema,
    node_def: &NodeDefinition,
    counter: Option<&str>,
    node: Arc<dyn Node>,
) -> Result<Arc<dyn Node>, DefinitionError> {
    let id = node_def.id.as_str();
    if let Some(message) = &node_def.announce {
        check_placeholders(schema, id, message)?;
    }

    let retry = match (&node_def.retry_announce, counter) {
        (Some(message), Some(counter)) => {
            fill(message, |name| {
                (name == "attempt" || schema.get(name).is_some()).then(String::new)
            })
            .map_err(|name| {
                DefinitionError::node(id, format!("unknown state field '{{{}}}'", name))
            })?;
            Some((message, counter))
        }
        (Some(_), None) => {
            return Err(DefinitionError::node(
                id,
                "retry_announce needs a generate step with a counter",
            ))
        }
        (None, _) => None,
    };

    if node_def.announce.is_none() && retry.is_none() {
        return Ok(node);
    }
    let mut announced = Announced::new(node_def.announce.as_deref(), node);
    if let Some((message, counter)) = retry {
        announced = announced.with_retry(message, counter);
    }
    Ok(Arc::new(announced))
}

fn check_placeholders(schema: &StateSchema, node: &str, text: &str) -> Result<(), DefinitionError> {
    fill(text, |name| schema.get(name).map(|_| String::new()))
        .map(|_| ())
        .map_err(|name| DefinitionError::node(node, format!("unknown state field '{{{}}}'", name)))
}

fn check_compose(schema: &StateSchema, node: &str, text: &str) -> Result<(), DefinitionError> {
    fill(text, |name| {
        (name == "output" || schema.get(name).is_some()).then(String::new)
    })
    .map(|_| ())
    .map_err(|name| DefinitionError::node(node, format!("unknown compose field '{{{}}}'", name)))
}
