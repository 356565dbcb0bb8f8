// SPDX-License-Identifier: MIT

//! Canonical run state and the partial updates steps return

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::schema::{FieldDef, MergePolicy, StateSchema};

/// A single conversation turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// The subset of state a step changed. Only what is listed here reaches the
/// merge; everything else is untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateUpdate {
    pub messages: Vec<Message>,
    pub fields: HashMap<String, Value>,
}

impl StateUpdate {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn message(message: Message) -> Self {
        Self {
            messages: vec![message],
            ..Self::default()
        }
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }
}

/// Canonical workflow state: the append-only conversation log plus the
/// schema-declared extension fields.
///
/// Owned exclusively by the execution engine for the duration of a run;
/// steps see `&WorkflowState` and hand back owned [`StateUpdate`]s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    messages: Vec<Message>,
    fields: HashMap<String, Value>,
    defs: HashMap<String, FieldDef>,
}

impl WorkflowState {
    /// Seed a state from a schema: declared defaults populate the fields
    pub fn new(schema: &StateSchema) -> Self {
        let mut fields = HashMap::new();
        for (name, def) in &schema.fields {
            if let Some(default) = &def.default {
                fields.insert(name.clone(), default.clone());
            }
        }

        Self {
            messages: Vec::new(),
            fields,
            defs: schema.fields.clone(),
        }
    }

    /// Merge a partial update into this state.
    ///
    /// Total per field: an omitted or null value never fails, it falls back
    /// to the prior value under replace-if-present and is stored as-is under
    /// replace-always. Messages only ever append.
    pub fn merge(&mut self, update: StateUpdate) {
        self.messages.extend(update.messages);

        for (name, value) in update.fields {
            match self.defs.get(&name) {
                Some(def) => match def.policy {
                    MergePolicy::ReplaceAlways => {
                        self.fields.insert(name, value);
                    }
                    MergePolicy::ReplaceIfPresent => {
                        if def.field_type.matches(&value) {
                            self.fields.insert(name, value);
                        }
                    }
                    MergePolicy::Append => {
                        let slot = self
                            .fields
                            .entry(name)
                            .or_insert_with(|| Value::Array(vec![]));
                        if let Value::Array(items) = slot {
                            match value {
                                Value::Array(new_items) => items.extend(new_items),
                                Value::Null => {}
                                other => items.push(other),
                            }
                        }
                    }
                },
                // Undeclared passthrough fields overwrite; the engine never
                // interprets them
                None => {
                    self.fields.insert(name, value);
                }
            }
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Content of the most recent user turn
    pub fn last_user_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    /// Content of the most recent assistant turn
    pub fn last_assistant_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn bool_field(&self, name: &str) -> Option<bool> {
        self.fields.get(name).and_then(|v| v.as_bool())
    }

    /// Presentation form: messages plus fields, schema internals omitted
    pub fn to_json(&self) -> Value {
        let fields: Map<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        serde_json::json!({
            "messages": self.messages,
            "fields": fields,
        })
    }
}
