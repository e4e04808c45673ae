//! Card templates embedded in the binary

use super::{CollaboratorError, Service};
use crate::activity::{Attachment, OAUTH_CARD_CONTENT_TYPE};
use chrono::{DateTime, Utc};
use rust_embed::Embed;
use serde_json::{json, Value};

#[derive(Embed)]
#[folder = "resources/cards"]
struct CardAssets;

/// The fixed set of card templates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardTemplate {
    CreateUser,
    GetUser,
    RemoveUser,
    DomainUser,
}

impl CardTemplate {
    const INTENT_CARDS: [CardTemplate; 3] = [
        CardTemplate::CreateUser,
        CardTemplate::GetUser,
        CardTemplate::RemoveUser,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CardTemplate::CreateUser => "CreateUser",
            CardTemplate::GetUser => "GetUser",
            CardTemplate::RemoveUser => "RemoveUser",
            CardTemplate::DomainUser => "DomainUser",
        }
    }

    fn file_name(self) -> String {
        format!("{}Card.json", self.name())
    }

    /// Card for an intent label, matched with spaces removed.
    ///
    /// Intents without a card (e.g. `Me`) return `None`.
    pub fn for_intent(intent: &str) -> Option<Self> {
        let normalized: String = intent.chars().filter(|c| !c.is_whitespace()).collect();
        Self::INTENT_CARDS
            .into_iter()
            .find(|card| card.name() == normalized)
    }

    /// Raw template JSON
    pub fn template_json(self) -> Result<String, CollaboratorError> {
        let file = CardAssets::get(&self.file_name()).ok_or_else(|| {
            CollaboratorError::rendering(format!("Card template {} is missing", self.name()))
        })?;
        String::from_utf8(file.data.into_owned()).map_err(|e| {
            CollaboratorError::rendering(format!("Card template {} is not UTF-8: {e}", self.name()))
        })
    }

    /// Template wrapped as an adaptive card attachment
    pub fn attachment(self) -> Result<Attachment, CollaboratorError> {
        let content: Value = serde_json::from_str(&self.template_json()?).map_err(|e| {
            CollaboratorError::rendering(format!("Card template {} is invalid: {e}", self.name()))
        })?;
        Ok(Attachment::adaptive(content))
    }
}

/// Sign-in card shown by the login prompt
pub fn login_card(connection_name: &str, expires_at: DateTime<Utc>) -> Attachment {
    Attachment {
        content_type: OAUTH_CARD_CONTENT_TYPE.to_string(),
        content: json!({
            "title": "Login",
            "text": "Please login",
            "connectionName": connection_name,
            "expiresAt": expires_at.to_rfc3339(),
        }),
    }
}

/// Parse a rendered card document into an attachment
pub fn rendered_attachment(rendered: &str) -> Result<Attachment, CollaboratorError> {
    let content: Value = serde_json::from_str(rendered).map_err(|e| {
        CollaboratorError::invalid_response(Service::Templating, format!("Rendered card is invalid: {e}"))
    })?;
    Ok(Attachment::adaptive(content))
}
