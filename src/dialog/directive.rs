//! Step inputs and outputs

use super::options::DialogOptions;
use super::stack::DialogKind;
use crate::activity::{InboundActivity, OutboundMessage};
use serde_json::Value;

/// What a step was resumed with
#[derive(Debug, Clone, PartialEq)]
pub enum Received {
    /// First step of a freshly begun frame
    Nothing,
    /// Result of the previous step, or of a completed child
    Value(Value),
    /// Raw user reply to this frame's prompt
    Reply(InboundActivity),
}

impl Received {
    pub fn value(&self) -> Option<&Value> {
        match self {
            Received::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn reply(&self) -> Option<&InboundActivity> {
        match self {
            Received::Reply(activity) => Some(activity),
            _ => None,
        }
    }

    /// Trimmed reply text, if the user typed something
    #[allow(dead_code)] // Used in tests
    pub fn reply_text(&self) -> Option<&str> {
        self.reply().and_then(InboundActivity::trimmed_text)
    }

    /// Collapse into the value handed to a parent on implicit completion
    pub fn into_value(self) -> Value {
        match self {
            Received::Nothing => Value::Null,
            Received::Value(v) => v,
            Received::Reply(activity) => match (activity.value, activity.text) {
                (Some(value), _) => value,
                (None, Some(text)) => Value::String(text),
                (None, None) => Value::Null,
            },
        }
    }
}

/// What a step asks the engine to do next
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// Send one message and suspend until the user replies
    Prompt(OutboundMessage),
    /// Run the next step now with this value
    Next(Value),
    /// Begin a child dialog; its result comes back to the next step
    Delegate {
        kind: DialogKind,
        options: DialogOptions,
    },
    /// Pop this frame and hand the result to the parent
    Complete(Value),
}

impl Directive {
    pub fn prompt_text(text: impl Into<String>) -> Self {
        Directive::Prompt(OutboundMessage::text(text))
    }

    pub fn delegate(options: DialogOptions) -> Self {
        Directive::Delegate {
            kind: options.kind(),
            options,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Directive::Prompt(_) => "prompt",
            Directive::Next(_) => "next",
            Directive::Delegate { .. } => "delegate",
            Directive::Complete(_) => "complete",
        }
    }
}
