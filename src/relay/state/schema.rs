// SPDX-License-Identifier: MIT

//! State schema definitions
//!
//! The schema is fixed when the graph is compiled; merge behavior is
//! knowable per field before any step runs.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Schema for the extension fields of a workflow state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateSchema {
    pub fields: HashMap<String, FieldDef>,
}

/// Definition of a single extension field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub field_type: FieldType,
    #[serde(default)]
    pub policy: MergePolicy,
    pub default: Option<Value>,
}

/// Supported field types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl FieldType {
    /// Whether a JSON value carries this type
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Array => value.is_array(),
            FieldType::Object => value.is_object(),
        }
    }
}

/// How a partial update combines with the existing value of a field
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Unconditionally overwrite
    #[default]
    ReplaceAlways,
    /// A supplied value of the declared type replaces the prior value;
    /// absent, null or mistyped values keep it
    ReplaceIfPresent,
    /// Concatenate onto the existing array
    Append,
}

impl StateSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field; builder-style
    pub fn field(
        mut self,
        name: impl Into<String>,
        field_type: FieldType,
        policy: MergePolicy,
        default: Option<Value>,
    ) -> Self {
        self.fields.insert(
            name.into(),
            FieldDef {
                field_type,
                policy,
                default,
            },
        );
        self
    }
}
