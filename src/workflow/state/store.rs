// SPDX-License-Identifier: MIT

//! Immutable state snapshots and partial updates

use serde_json::Value;
use std::sync::Arc;

use super::schema::{FieldType, Message, ReducerType, StateSchema};
use crate::error::StateError;

/// Ordered list of field updates returned by a step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialState {
    updates: Vec<(String, Value)>,
}

impl PartialState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style update
    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.updates.push((key.to_string(), value.into()));
    }

    /// Append the updates of `other` after this one's
    pub fn extend(&mut self, other: PartialState) {
        self.updates.extend(other.updates);
    }

    /// Last value written for `key`
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.updates
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.updates.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }
}

/// Immutable snapshot of workflow state
///
/// Values are stored in schema order. Every [`State::merge`] returns a new
/// snapshot with `version` bumped by one; the receiver is left untouched.
#[derive(Debug, Clone)]
pub struct State {
    schema: Arc<StateSchema>,
    values: Vec<Value>,
    version: u64,
}

impl State {
    /// Create the initial snapshot: every field takes its default unless
    /// `initial` assigns it.
    pub fn initialize(schema: Arc<StateSchema>, initial: &PartialState) -> Result<Self, StateError> {
        schema.validate()?;

        let mut values: Vec<Value> = schema
            .fields
            .iter()
            .map(|def| {
                def.default
                    .clone()
                    .unwrap_or_else(|| def.field_type.zero())
            })
            .collect();

        for (key, value) in initial.iter() {
            let idx = schema
                .index_of(key)
                .ok_or_else(|| StateError::UnknownField(key.to_string()))?;
            let field_type = schema.fields[idx].field_type;
            if !field_type.accepts(value) {
                return Err(mismatch(key, field_type, value));
            }
            values[idx] = value.clone();
        }

        Ok(Self {
            schema,
            values,
            version: 0,
        })
    }

    /// Apply a partial update, returning the next snapshot.
    ///
    /// Overwrite fields take the update; append fields concatenate it in
    /// order; untouched fields carry over.
    pub fn merge(&self, partial: &PartialState) -> Result<State, StateError> {
        let mut values = self.values.clone();

        for (key, value) in partial.iter() {
            let idx = self
                .schema
                .index_of(key)
                .ok_or_else(|| StateError::UnknownField(key.to_string()))?;
            let def = &self.schema.fields[idx];

            match def.reducer {
                ReducerType::Overwrite => {
                    if !def.field_type.accepts(value) {
                        return Err(mismatch(key, def.field_type, value));
                    }
                    values[idx] = value.clone();
                }
                ReducerType::Append => {
                    let new_items: Vec<Value> = match value {
                        Value::Array(items) => items.clone(),
                        other => vec![other.clone()],
                    };
                    if let Some(bad) = new_items
                        .iter()
                        .find(|v| !def.field_type.accepts_element(v))
                    {
                        return Err(mismatch(key, def.field_type, bad));
                    }
                    if let Value::Array(current) = &mut values[idx] {
                        current.extend(new_items);
                    }
                }
            }
        }

        Ok(State {
            schema: Arc::clone(&self.schema),
            values,
            version: self.version + 1,
        })
    }

    /// Get a field value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.schema.index_of(key).map(|idx| &self.values[idx])
    }

    /// Get a nested value using dot notation (e.g., "messages.0.role")
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.get(parts.next()?)?;
        for part in parts {
            current = match current {
                Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                other => other.get(part)?,
            };
        }
        Some(current)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_str())
    }

    pub fn text_list(&self, key: &str) -> Option<Vec<String>> {
        self.get(key)?.as_array().map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
    }

    pub fn boolean(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_i64())
    }

    pub fn messages(&self, key: &str) -> Vec<Message> {
        self.get(key)
            .and_then(|v| v.as_array())
            .map(|items| items.iter().filter_map(Message::from_value).collect())
            .unwrap_or_default()
    }

    /// Plain-text view of a field, used when filling prompt templates
    pub fn render_text(&self, key: &str) -> Option<String> {
        let idx = self.schema.index_of(key)?;
        let value = &self.values[idx];
        let text = match self.schema.fields[idx].field_type {
            FieldType::Text => value.as_str().unwrap_or_default().to_string(),
            FieldType::TextList => value
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|v| v.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default(),
            FieldType::Boolean | FieldType::Integer => value.to_string(),
            FieldType::Messages => self
                .messages(key)
                .iter()
                .map(|m| format!("{}: {}", m.role, m.content))
                .collect::<Vec<_>>()
                .join("\n"),
        };
        Some(text)
    }

    /// Number of merges since initialization
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn schema(&self) -> &StateSchema {
        &self.schema
    }

    /// Fields in schema order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.schema.names().zip(self.values.iter())
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.fields().eq(other.fields())
    }
}

fn mismatch(field: &str, expected: FieldType, found: &Value) -> StateError {
    StateError::TypeMismatch {
        field: field.to_string(),
        expected: expected.to_string(),
        found: found.to_string(),
    }
}
