//! Frames and the persisted dialog stack

use super::options::DialogOptions;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// The dialog kinds the engine knows how to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogKind {
    Router,
    CreateUser,
    RemoveUser,
    DomainName,
}

impl DialogKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DialogKind::Router => "router",
            DialogKind::CreateUser => "create_user",
            DialogKind::RemoveUser => "remove_user",
            DialogKind::DomainName => "domain_name",
        }
    }
}

impl fmt::Display for DialogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DialogKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "router" => Ok(DialogKind::Router),
            "create_user" => Ok(DialogKind::CreateUser),
            "remove_user" => Ok(DialogKind::RemoveUser),
            "domain_name" => Ok(DialogKind::DomainName),
            other => Err(other.to_string()),
        }
    }
}

/// Cursor value of a frame whose first step has not run
pub const NOT_STARTED: i32 = -1;

/// Private scratch storage of one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(Map<String, Value>);

impl Values {
    #[allow(dead_code)] // Used in tests
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Deserialize a typed value, `None` if absent or of another shape
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.0
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn store<T: Serialize>(&mut self, key: impl Into<String>, value: &T) {
        // Types stored here are plain data; serialization cannot fail.
        if let Ok(v) = serde_json::to_value(value) {
            self.0.insert(key.into(), v);
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One activation record of a dialog instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub kind: DialogKind,
    /// Index of the step that ran last, or `NOT_STARTED`
    pub cursor: i32,
    #[serde(default)]
    pub values: Values,
    pub options: DialogOptions,
    /// Set when the last directive of this frame was a prompt
    #[serde(default)]
    pub awaiting_input: bool,
}

impl Frame {
    pub fn new(kind: DialogKind, options: DialogOptions) -> Self {
        Self {
            kind,
            cursor: NOT_STARTED,
            values: Values::default(),
            options,
            awaiting_input: false,
        }
    }

    /// Index of the step that runs next
    pub fn next_step(&self) -> usize {
        usize::try_from(self.cursor + 1).unwrap_or(0)
    }
}

/// Ordered frames of one conversation; the last frame is the active one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DialogStack {
    frames: Vec<Frame>,
}

impl DialogStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// True when the top frame is suspended waiting for a reply
    pub fn is_waiting(&self) -> bool {
        self.top().is_some_and(|f| f.awaiting_input)
    }

    /// Copy fit for display, with every access token replaced
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for frame in &mut copy.frames {
            frame.options.redact_tokens();
        }
        copy
    }
}
