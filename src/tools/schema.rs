//! Statically declared tool input schemas.
//!
//! A [`ToolSchema`] describes an object of typed properties. It exports itself
//! as JSON Schema for the provider request and validates model-supplied input
//! before a tool runs, so tools can read their fields without re-checking.

use serde_json::{json, Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl SchemaType {
    pub fn as_str(self) -> &'static str {
        match self {
            SchemaType::String => "string",
            SchemaType::Integer => "integer",
            SchemaType::Number => "number",
            SchemaType::Boolean => "boolean",
            SchemaType::Object => "object",
            SchemaType::Array => "array",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            SchemaType::String => value.is_string(),
            SchemaType::Integer => value.is_i64() || value.is_u64(),
            SchemaType::Number => value.is_number(),
            SchemaType::Boolean => value.is_boolean(),
            SchemaType::Object => value.is_object(),
            SchemaType::Array => value.is_array(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaProperty {
    pub name: String,
    pub kind: SchemaType,
    pub description: Option<String>,
    pub required: bool,
    pub allowed: Option<Vec<Value>>,
}

impl SchemaProperty {
    pub fn new(name: impl Into<String>, kind: SchemaType) -> Self {
        Self {
            name: name.into(),
            kind,
            description: None,
            required: false,
            allowed: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn one_of(mut self, allowed: impl IntoIterator<Item = Value>) -> Self {
        self.allowed = Some(allowed.into_iter().collect());
        self
    }

    fn to_json(&self) -> Value {
        let mut out = Map::new();
        out.insert("type".to_string(), json!(self.kind.as_str()));
        if let Some(description) = &self.description {
            out.insert("description".to_string(), json!(description));
        }
        if let Some(allowed) = &self.allowed {
            out.insert("enum".to_string(), Value::Array(allowed.clone()));
        }
        Value::Object(out)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    #[error("input must be a JSON object")]
    NotAnObject,
    #[error("missing required field '{0}'")]
    MissingField(String),
    #[error("field '{field}' must be of type {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },
    #[error("field '{field}' must be one of {allowed}")]
    NotAllowed { field: String, allowed: String },
    #[error("unexpected field '{0}'")]
    UnknownField(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolSchema {
    properties: Vec<SchemaProperty>,
}

impl ToolSchema {
    pub fn object() -> Self {
        Self::default()
    }

    pub fn property(mut self, property: SchemaProperty) -> Self {
        self.properties.push(property);
        self
    }

    pub fn properties(&self) -> &[SchemaProperty] {
        &self.properties
    }

    pub fn to_json(&self) -> Value {
        let properties: Map<String, Value> = self
            .properties
            .iter()
            .map(|property| (property.name.clone(), property.to_json()))
            .collect();
        let required: Vec<Value> = self
            .properties
            .iter()
            .filter(|property| property.required)
            .map(|property| json!(property.name))
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    pub fn validate(&self, input: &Value) -> Result<(), SchemaViolation> {
        let Some(object) = input.as_object() else {
            return Err(SchemaViolation::NotAnObject);
        };

        if let Some(unknown) = object
            .keys()
            .find(|key| !self.properties.iter().any(|p| &p.name == *key))
        {
            return Err(SchemaViolation::UnknownField(unknown.clone()));
        }

        for property in &self.properties {
            let Some(value) = object.get(&property.name) else {
                if property.required {
                    return Err(SchemaViolation::MissingField(property.name.clone()));
                }
                continue;
            };

            if !property.kind.matches(value) {
                return Err(SchemaViolation::WrongType {
                    field: property.name.clone(),
                    expected: property.kind.as_str(),
                });
            }

            if let Some(allowed) = &property.allowed {
                if !allowed.contains(value) {
                    return Err(SchemaViolation::NotAllowed {
                        field: property.name.clone(),
                        allowed: Value::Array(allowed.clone()).to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}
