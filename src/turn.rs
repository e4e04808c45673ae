//! Per-invocation turn context

use crate::activity::{InboundActivity, OutboundMessage};

/// Everything a single invocation knows about the message being handled.
///
/// Outbound messages are buffered here and only delivered once the turn
/// commits, so an aborted turn sends nothing.
#[derive(Debug)]
pub struct TurnContext {
    conversation_id: String,
    activity: InboundActivity,
    outbox: Vec<OutboundMessage>,
}

impl TurnContext {
    pub fn new(conversation_id: impl Into<String>, activity: InboundActivity) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            activity,
            outbox: Vec::new(),
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn activity(&self) -> &InboundActivity {
        &self.activity
    }

    pub fn send(&mut self, message: OutboundMessage) {
        self.outbox.push(message);
    }

    pub fn send_text(&mut self, text: impl Into<String>) {
        self.send(OutboundMessage::text(text));
    }

    #[allow(dead_code)] // Used in tests
    pub fn outbox(&self) -> &[OutboundMessage] {
        &self.outbox
    }

    pub fn into_outbox(self) -> Vec<OutboundMessage> {
        self.outbox
    }
}
