//! API request and response types

use crate::activity::InboundActivity;
use crate::db::TranscriptEntry;
use crate::dialog::DialogStack;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One inbound message for a conversation
#[derive(Debug, Deserialize)]
pub struct ActivityRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
}

impl ActivityRequest {
    /// `None` when the request carries neither text nor a value
    pub fn into_activity(self) -> Option<InboundActivity> {
        if self.text.is_none() && self.value.is_none() {
            return None;
        }
        Some(InboundActivity {
            text: self.text,
            value: self.value,
        })
    }
}

/// Token handed over by the sign-in flow
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub token: String,
    #[serde(default)]
    pub expires_in_secs: Option<u32>,
}

/// Response with the persisted dialog stack
#[derive(Debug, Serialize)]
pub struct StackResponse {
    pub stack: DialogStack,
    pub waiting: bool,
    pub depth: usize,
}

/// Response with the committed turns of a conversation
#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub entries: Vec<TranscriptEntry>,
}

/// Response for actions without a payload
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
