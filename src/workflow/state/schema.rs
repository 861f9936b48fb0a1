// SPDX-License-Identifier: MIT

//! State schema definitions

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::fmt;

use crate::error::StateError;

/// Schema defining the workflow state structure, in declaration order
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(transparent)]
pub struct StateSchema {
    pub fields: Vec<StateFieldDef>,
}

/// Definition of a single state field
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StateFieldDef {
    pub name: String,
    /// Type of the field
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Reducer for merging values
    #[serde(default)]
    pub reducer: ReducerType,
    /// Default value, the type's zero value when absent
    #[serde(default)]
    pub default: Option<Value>,
}

/// Supported field types
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    TextList,
    Boolean,
    Integer,
    Messages,
}

/// Reducer types for merging values into state
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReducerType {
    /// Replace the value (default)
    #[default]
    Overwrite,
    /// Concatenate onto the existing sequence
    Append,
}

/// One entry of a conversation log
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }

    pub fn to_value(&self) -> Value {
        json!({ "role": self.role, "content": self.content })
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        Some(Self {
            role: value.get("role")?.as_str()?.to_string(),
            content: value.get("content")?.as_str()?.to_string(),
        })
    }
}

impl FieldType {
    /// Whether a whole value has the right shape for this type
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::Text => value.is_string(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::TextList | FieldType::Messages => value
                .as_array()
                .map(|items| items.iter().all(|v| self.accepts_element(v)))
                .unwrap_or(false),
        }
    }

    /// Whether a single element may be appended to a list-shaped field
    pub fn accepts_element(&self, value: &Value) -> bool {
        match self {
            FieldType::TextList => value.is_string(),
            FieldType::Messages => Message::from_value(value).is_some(),
            _ => false,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, FieldType::TextList | FieldType::Messages)
    }

    /// Zero value used when a field declares no default
    pub fn zero(&self) -> Value {
        match self {
            FieldType::Text => json!(""),
            FieldType::TextList | FieldType::Messages => json!([]),
            FieldType::Boolean => json!(false),
            FieldType::Integer => json!(0),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Text => "text",
            FieldType::TextList => "text_list",
            FieldType::Boolean => "boolean",
            FieldType::Integer => "integer",
            FieldType::Messages => "messages",
        };
        write!(f, "{}", name)
    }
}

impl StateSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an overwrite field with the type's zero default
    pub fn field(self, name: &str, field_type: FieldType) -> Self {
        self.push(name, field_type, ReducerType::Overwrite, None)
    }

    /// Declare an overwrite field with an explicit default
    pub fn field_with_default(self, name: &str, field_type: FieldType, default: Value) -> Self {
        self.push(name, field_type, ReducerType::Overwrite, Some(default))
    }

    /// Declare an append-only field
    pub fn append_field(self, name: &str, field_type: FieldType) -> Self {
        self.push(name, field_type, ReducerType::Append, None)
    }

    fn push(
        mut self,
        name: &str,
        field_type: FieldType,
        reducer: ReducerType,
        default: Option<Value>,
    ) -> Self {
        self.fields.push(StateFieldDef {
            name: name.to_string(),
            field_type,
            reducer,
            default,
        });
        self
    }

    /// Reject duplicate names, append on scalar fields and mistyped defaults
    pub fn validate(&self) -> Result<(), StateError> {
        let mut seen = HashSet::new();
        for def in &self.fields {
            if !seen.insert(def.name.as_str()) {
                return Err(StateError::InvalidSchema(format!(
                    "field '{}' declared twice",
                    def.name
                )));
            }
            if def.reducer == ReducerType::Append && !def.field_type.is_list() {
                return Err(StateError::InvalidSchema(format!(
                    "append reducer on {} field '{}'",
                    def.field_type, def.name
                )));
            }
            if let Some(default) = &def.default {
                if !def.field_type.accepts(default) {
                    return Err(StateError::TypeMismatch {
                        field: def.name.clone(),
                        expected: def.field_type.to_string(),
                        found: default.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&StateFieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_schema_deserialize() {
        let yaml = r#"
            - name: country
              type: text
            - name: research_attempts
              type: integer
              default: 0
            - name: messages
              type: messages
              reducer: append
        "#;
        let schema: StateSchema = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(schema.len(), 3);
        assert_eq!(schema.fields[0].field_type, FieldType::Text);
        assert_eq!(schema.fields[1].default, Some(json!(0)));
        assert_eq!(schema.fields[2].reducer, ReducerType::Append);
        assert_eq!(
            schema.names().collect::<Vec<_>>(),
            vec!["country", "research_attempts", "messages"]
        );
    }

    #[test]
    fn test_reducer_default() {
        let yaml = "[{ name: x, type: text }]";
        let schema: StateSchema = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(schema.fields[0].reducer, ReducerType::Overwrite);
    }

    #[test]
    fn test_field_types_accept() {
        assert!(FieldType::Text.accepts(&json!("hi")));
        assert!(!FieldType::Text.accepts(&json!(1)));
        assert!(FieldType::Integer.accepts(&json!(3)));
        assert!(!FieldType::Integer.accepts(&json!(3.5)));
        assert!(FieldType::Boolean.accepts(&json!(true)));
        assert!(FieldType::TextList.accepts(&json!(["a", "b"])));
        assert!(!FieldType::TextList.accepts(&json!(["a", 2])));
        assert!(FieldType::Messages.accepts(&json!([{"role": "user", "content": "x"}])));
        assert!(!FieldType::Messages.accepts(&json!([{"role": "user"}])));
    }

    #[test]
    fn test_validate_rejects_duplicate_field() {
        let schema = StateSchema::new()
            .field("a", FieldType::Text)
            .field("a", FieldType::Integer);
        assert!(matches!(
            schema.validate(),
            Err(StateError::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_validate_rejects_append_on_scalar() {
        let schema = StateSchema::new().append_field("count", FieldType::Integer);
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_mistyped_default() {
        let schema =
            StateSchema::new().field_with_default("flag", FieldType::Boolean, json!("yes"));
        assert!(matches!(
            schema.validate(),
            Err(StateError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_message_value_roundtrip() {
        let msg = Message::assistant("done");
        assert_eq!(Message::from_value(&msg.to_value()), Some(msg));
    }
}
