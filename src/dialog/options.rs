//! Typed options handed to a dialog when it is begun

use super::stack::DialogKind;
use crate::activity::Attachment;
use crate::services::{AccessToken, Entity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Entity name the classifier uses for a user's domain-name prefix
pub const DOMAIN_NAME_ENTITY: &str = "DomainName";

/// Stands in for access tokens in stacks shown outside the process
pub const REDACTED_TOKEN: &str = "<redacted>";

/// Options shared by the slot-filling dialogs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotOptions {
    pub token: AccessToken,
    /// Classifier entities keyed by their own name
    #[serde(default)]
    pub entities: BTreeMap<String, String>,
    /// Card matched to the intent, if the intent has one
    #[serde(default)]
    pub card: Option<Attachment>,
    /// Domain-suffix choice card
    pub domain_card: Attachment,
}

impl SlotOptions {
    pub fn new(token: AccessToken, domain_card: Attachment) -> Self {
        Self {
            token,
            entities: BTreeMap::new(),
            card: None,
            domain_card,
        }
    }

    /// Copy entities in; the first value seen for a name wins
    pub fn with_entities<'a>(mut self, entities: impl IntoIterator<Item = &'a Entity>) -> Self {
        for entity in entities {
            self.entities
                .entry(entity.name.clone())
                .or_insert_with(|| entity.value.clone());
        }
        self
    }

    pub fn with_card(mut self, card: Option<Attachment>) -> Self {
        self.card = card;
        self
    }

    fn redact_token(&mut self) {
        self.token = AccessToken::new(REDACTED_TOKEN, self.token.expires_at);
    }

    pub fn entity(&self, name: &str) -> Option<&str> {
        self.entities
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// Directory action carried into the domain-name dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserAction {
    Get,
    Disable,
    Enable,
}

impl UserAction {
    pub fn from_intent(intent: &str) -> Option<Self> {
        match intent {
            "Get User" => Some(UserAction::Get),
            "Disable User" => Some(UserAction::Disable),
            "Enable User" => Some(UserAction::Enable),
            _ => None,
        }
    }

    pub fn intent(self) -> &'static str {
        match self {
            UserAction::Get => "Get User",
            UserAction::Disable => "Disable User",
            UserAction::Enable => "Enable User",
        }
    }

    /// Verb used in user-facing messages
    pub fn verb(self) -> &'static str {
        match self {
            UserAction::Get => "look up the user",
            UserAction::Disable => "disable the user",
            UserAction::Enable => "enable the user",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainNameOptions {
    pub slots: SlotOptions,
    pub action: UserAction,
}

/// Options bag, one variant per dialog kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dialog", rename_all = "snake_case")]
pub enum DialogOptions {
    Router,
    CreateUser(SlotOptions),
    RemoveUser(SlotOptions),
    DomainName(DomainNameOptions),
}

impl DialogOptions {
    /// The dialog kind these options are meant for
    pub fn kind(&self) -> DialogKind {
        match self {
            DialogOptions::Router => DialogKind::Router,
            DialogOptions::CreateUser(_) => DialogKind::CreateUser,
            DialogOptions::RemoveUser(_) => DialogKind::RemoveUser,
            DialogOptions::DomainName(_) => DialogKind::DomainName,
        }
    }

    /// Replace any carried access token with [`REDACTED_TOKEN`]
    pub fn redact_tokens(&mut self) {
        match self {
            DialogOptions::Router => {}
            DialogOptions::CreateUser(slots) | DialogOptions::RemoveUser(slots) => {
                slots.redact_token();
            }
            DialogOptions::DomainName(options) => options.slots.redact_token(),
        }
    }
}
