//! Core data structures shared by providers, the orchestrator, and the transport.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Flat parameter set describing one captcha challenge on the wire.
///
/// A descriptor can only be created with its `type` discriminator, so every
/// descriptor handed to the transport carries the field the remote service
/// dispatches on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TaskDescriptor {
    params: Map<String, Value>,
}

impl TaskDescriptor {
    pub fn new(task_type: impl Into<String>) -> Self {
        let mut params = Map::new();
        params.insert("type".into(), Value::String(task_type.into()));
        Self { params }
    }

    /// Adds a parameter. The `type` key is reserved and silently kept.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key != "type" {
            self.params.insert(key, value.into());
        }
        self
    }

    /// Adds a parameter only when a value is present.
    pub fn with_opt<V: Into<Value>>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.with(key, value),
            None => self,
        }
    }

    pub fn task_type(&self) -> &str {
        self.params
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }
}

/// Identifier the remote service assigned to a submitted task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskHandle(String);

impl TaskHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskHandle {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Status of a task as reported by one poll.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskStatus {
    Pending,
    Ready(Value),
}

/// Solved task returned to the caller.
#[derive(Debug, Clone)]
pub struct CaptchaSolution {
    task_id: TaskHandle,
    solution: Value,
    polls: usize,
    solved_at: DateTime<Utc>,
}

impl CaptchaSolution {
    pub fn new(task_id: TaskHandle, solution: Value, polls: usize) -> Self {
        Self {
            task_id,
            solution,
            polls,
            solved_at: Utc::now(),
        }
    }

    pub fn task_id(&self) -> &TaskHandle {
        &self.task_id
    }

    /// Decoded solution payload exactly as the service returned it.
    pub fn solution(&self) -> &Value {
        &self.solution
    }

    /// Solution payload re-encoded as JSON text.
    pub fn raw(&self) -> String {
        self.solution.to_string()
    }

    /// Best-effort extraction of the answer token.
    ///
    /// Plain string solutions are returned as-is; object solutions are probed
    /// for the token fields used by the token-style captcha variants.
    pub fn token(&self) -> Option<&str> {
        match &self.solution {
            Value::String(text) => Some(text),
            Value::Object(fields) => ["gRecaptchaResponse", "token", "text"]
                .iter()
                .find_map(|key| fields.get(*key).and_then(Value::as_str)),
            _ => None,
        }
    }

    /// Number of result polls issued before the task became ready.
    pub fn polls(&self) -> usize {
        self.polls
    }

    pub fn solved_at(&self) -> DateTime<Utc> {
        self.solved_at
    }
}
