//! Inbound and outbound message types
//!
//! The only user-visible protocol is text plus opaque card attachments.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ADAPTIVE_CARD_CONTENT_TYPE: &str = "application/vnd.microsoft.card.adaptive";
pub const HERO_CARD_CONTENT_TYPE: &str = "application/vnd.microsoft.card.hero";
pub const OAUTH_CARD_CONTENT_TYPE: &str = "application/vnd.microsoft.card.oauth";

/// One physical message received from the user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InboundActivity {
    /// Free text typed by the user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Structured payload submitted from a card
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl InboundActivity {
    #[allow(dead_code)] // Used in tests
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            value: None,
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn value(value: Value) -> Self {
        Self {
            text: None,
            value: Some(value),
        }
    }

    /// Trimmed text, if any non-empty text was sent
    pub fn trimmed_text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Structured payload as a JSON object
    pub fn value_object(&self) -> Option<&serde_json::Map<String, Value>> {
        self.value.as_ref().and_then(Value::as_object)
    }
}

/// A card attached to an outbound message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub content_type: String,
    pub content: Value,
}

impl Attachment {
    pub fn adaptive(content: Value) -> Self {
        Self {
            content_type: ADAPTIVE_CARD_CONTENT_TYPE.to_string(),
            content,
        }
    }

    pub fn hero(title: &str, subtitle: &str, text: &str, image_url: Option<&str>) -> Self {
        let images: Vec<Value> = image_url
            .into_iter()
            .map(|url| serde_json::json!({ "url": url }))
            .collect();
        Self {
            content_type: HERO_CARD_CONTENT_TYPE.to_string(),
            content: serde_json::json!({
                "title": title,
                "subtitle": subtitle,
                "text": text,
                "images": images,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentLayout {
    List,
    Carousel,
}

/// A message sent back to the user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<AttachmentLayout>,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn card(attachment: Attachment) -> Self {
        Self {
            attachments: vec![attachment],
            ..Self::default()
        }
    }

    pub fn carousel(attachments: Vec<Attachment>) -> Self {
        Self {
            text: None,
            attachments,
            layout: Some(AttachmentLayout::Carousel),
        }
    }

    /// True if this message carries a card of the given content type
    #[allow(dead_code)] // Used in tests
    pub fn has_card(&self, content_type: &str) -> bool {
        self.attachments
            .iter()
            .any(|a| a.content_type == content_type)
    }
}
