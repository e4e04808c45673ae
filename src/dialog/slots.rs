//! Steps shared by the slot-filling dialogs

use super::directive::Directive;
use super::engine::StepContext;
use super::options::{SlotOptions, DOMAIN_NAME_ENTITY};
use super::profile::{ProfileError, UserProfile};
use super::stack::Values;
use crate::activity::{Attachment, OutboundMessage};
use crate::services::WriteOutcome;
use serde_json::Value;

const PROFILE_KEY: &str = "profile";

pub const NAME_INSTRUCTION: &str = "Please enter the domain name of the user.";
pub const NAME_EXAMPLE: &str = "EXAMPLE: upn = johndoe2@student.hogent.be | domain name = johndoe2";
pub const DEMO_NOTICE: &str = "This is a DEMO, no write actions were executed";

/// How collect-name asks for the user when no entity was recognized
pub enum NamePrompt {
    /// Free text answer, introduced by the example line
    Example,
    /// Structured answer from a card
    Card {
        instruction: &'static str,
        card: Attachment,
    },
}

pub fn load_profile(values: &Values) -> UserProfile {
    values.load(PROFILE_KEY).unwrap_or_default()
}

pub fn save_profile(values: &mut Values, profile: &UserProfile) {
    values.store(PROFILE_KEY, profile);
}

/// Use a recognized domain-name entity, or ask for the user
pub fn collect_name(cx: &mut StepContext<'_>, slots: &SlotOptions, prompt: NamePrompt) -> Directive {
    let mut profile = UserProfile::default();

    if let Some(name) = slots.entity(DOMAIN_NAME_ENTITY) {
        profile.set_domain_name(name);
        save_profile(cx.values, &profile);
        tracing::debug!(domain_name = ?profile.domain_name, "Domain name taken from entity");
        return Directive::Next(Value::Null);
    }

    save_profile(cx.values, &profile);
    match prompt {
        NamePrompt::Example => {
            cx.send_text(NAME_INSTRUCTION);
            Directive::prompt_text(NAME_EXAMPLE)
        }
        NamePrompt::Card { instruction, card } => {
            cx.send_text(instruction);
            Directive::Prompt(OutboundMessage::card(card))
        }
    }
}

/// Merge the name reply, then ask for the domain suffix
pub fn collect_domain(
    cx: &mut StepContext<'_>,
    slots: &SlotOptions,
) -> Result<Directive, ProfileError> {
    let mut profile = load_profile(cx.values);

    if let Some(reply) = cx.received.reply() {
        if let Some(fields) = reply.value_object() {
            profile.merge_fields(fields, cx.services.settings.unknown_fields)?;
        } else if let Some(text) = reply.trimmed_text() {
            profile.set_domain_name(text);
        }
    }

    save_profile(cx.values, &profile);
    Ok(Directive::Prompt(OutboundMessage::card(
        slots.domain_card.clone(),
    )))
}

/// Merge the domain-choice reply into the stored profile
pub fn merge_domain(cx: &mut StepContext<'_>) -> Result<UserProfile, ProfileError> {
    let mut profile = load_profile(cx.values);

    if let Some(reply) = cx.received.reply() {
        if let Some(fields) = reply.value_object() {
            profile.merge_fields(fields, cx.services.settings.unknown_fields)?;
        } else if let Some(text) = reply.trimmed_text().filter(|t| t.starts_with('@')) {
            profile.domain = Some(text.to_string());
        }
    }

    save_profile(cx.values, &profile);
    Ok(profile)
}

/// Report a directory write, flagging simulated ones
pub fn report_write(cx: &mut StepContext<'_>, upn: &str, done: &str, outcome: WriteOutcome) {
    cx.send_text(format!("The user: {upn} has been {done}."));
    if outcome == WriteOutcome::Simulated {
        cx.send_text(DEMO_NOTICE);
    }
}
