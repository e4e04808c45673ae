//! Root dialog: sign-in, command, intent dispatch

use super::directive::Directive;
use super::engine::{Dialog, EngineError, StepContext, StepFailure};
use super::options::{DialogOptions, DomainNameOptions, SlotOptions, UserAction};
use super::stack::DialogKind;
use crate::activity::{Attachment, OutboundMessage};
use crate::services::{
    login_card, AccessToken, CardTemplate, IntentPrediction, License, MailMessage, TokenStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

const LOGIN_EXPIRES_KEY: &str = "login_expires_at";
const COMMAND_KEY: &str = "command";

pub const LOGIN_FAILED: &str = "Login was not successful please try again.";
pub const ASK_COMMAND: &str = "What would you like me to do?";
pub const LOGIN_UNAVAILABLE: &str = "We couldn't log you in. Please try again later.";
pub const NO_RECENT_MAIL: &str = "Unable to find any recent unread mail.";
pub const NO_LICENSES: &str = "No licenses found for this tenant.";
pub const NOT_ENABLED: &str = "The function isn't enabled";
pub const NOT_UNDERSTOOD: &str = "Sorry, I don't know what you mean";
pub const CAPABILITIES: &str = "Currently i have the ability to create/remove/delete/disable/enable a user, check your tenant licenses and get your recent mail.";
pub const ANOTHER_COMMAND: &str = "Type anything to give me another command.";

const MAIL_LIMIT: usize = 5;
const OUTLOOK_LOGO: &str = "https://botframeworksamples.blob.core.windows.net/samples/OutlookLogo.jpg";

/// Intent labels the router dispatches on
pub mod intents {
    pub const ME: &str = "Me";
    pub const RECENT: &str = "Recent";
    pub const CHECK_LICENSES: &str = "Check Licenses";
    pub const SEND_MAIL: &str = "Send mail";
    pub const CREATE_USER: &str = "Create User";
    pub const REMOVE_USER: &str = "Remove User";
}

pub struct RouterDialog;

impl RouterDialog {
    const PROMPT_LOGIN: usize = 0;
    const LOGIN_RESULT: usize = 1;
    const COMMAND: usize = 2;
    const CLASSIFY_AND_DISPATCH: usize = 3;
    const FINALIZE: usize = 4;
}

fn token_value(token: &AccessToken) -> Value {
    serde_json::to_value(token).unwrap_or(Value::Null)
}

/// Prompt with the sign-in card and remember when it stops being valid
fn login_prompt(cx: &mut StepContext<'_>) -> Directive {
    let settings = &cx.services.settings;
    let timeout = chrono::Duration::from_std(settings.login_timeout)
        .unwrap_or_else(|_| chrono::Duration::minutes(5));
    let expires_at = Utc::now() + timeout;
    let card = login_card(&settings.connection_name, expires_at);
    cx.values.store(LOGIN_EXPIRES_KEY, &expires_at);
    tracing::info!(conv_id = %cx.conversation_id(), %expires_at, "Prompting for login");
    Directive::Prompt(OutboundMessage::card(card))
}

fn login_expired(cx: &StepContext<'_>) -> bool {
    cx.values
        .load::<DateTime<Utc>>(LOGIN_EXPIRES_KEY)
        .is_some_and(|at| Utc::now() > at)
}

/// Token handed over by the previous step, or fetched again after a login prompt
async fn resolve_token(cx: &mut StepContext<'_>) -> Result<Option<AccessToken>, StepFailure> {
    if let Some(value) = cx.received.value() {
        return Ok(serde_json::from_value(value.clone()).ok());
    }
    if cx.received.reply().is_none() {
        return Ok(None);
    }
    if login_expired(cx) {
        tracing::info!(conv_id = %cx.conversation_id(), "Login prompt expired");
        return Ok(None);
    }
    let status = cx
        .services
        .auth
        .acquire_token(cx.turn.conversation_id())
        .await?;
    Ok(match status {
        TokenStatus::Token(token) => Some(token),
        TokenStatus::NeedsLogin => None,
    })
}

/// Options handed to whichever child the intent selects
fn slot_options(
    token: AccessToken,
    prediction: &IntentPrediction,
) -> Result<SlotOptions, StepFailure> {
    let card = CardTemplate::for_intent(&prediction.intent)
        .map(CardTemplate::attachment)
        .transpose()?;
    Ok(SlotOptions::new(token, CardTemplate::DomainUser.attachment()?)
        .with_entities(&prediction.entities)
        .with_card(card))
}

fn mail_card(mail: &MailMessage) -> Attachment {
    let from = mail.from.as_ref().map_or_else(String::new, |r| {
        format!("{} <{}>", r.email_address.name, r.email_address.address)
    });
    Attachment::hero(
        mail.subject.as_deref().unwrap_or("(no subject)"),
        &from,
        mail.body_preview.as_deref().unwrap_or_default(),
        Some(OUTLOOK_LOGO),
    )
}

fn license_card(license: &License) -> Attachment {
    Attachment::hero(
        &license.sku_part_number,
        &license.sku_id,
        &format!("{} in use", license.consumed_units),
        None,
    )
}

async fn classify_and_dispatch(cx: &mut StepContext<'_>) -> Result<Directive, StepFailure> {
    let Some(token) = resolve_token(cx).await? else {
        cx.send_text(LOGIN_UNAVAILABLE);
        return Ok(Directive::Next(Value::Null));
    };

    let services = cx.services;
    let utterance = cx.values.get_str(COMMAND_KEY).unwrap_or_default().to_string();
    let prediction = services.nlu.classify(&utterance).await?;
    tracing::info!(
        conv_id = %cx.conversation_id(),
        intent = %prediction.intent,
        entities = prediction.entities.len(),
        "Classified command"
    );

    let slots = slot_options(token, &prediction)?;
    let directory = &services.directory;

    match prediction.intent.as_str() {
        intents::ME => {
            let me = directory.list_me(&slots.token).await?;
            let name = me
                .display_name
                .or(me.user_principal_name)
                .unwrap_or_else(|| "unknown".to_string());
            cx.send_text(format!("You are {name}."));
        }
        intents::RECENT => {
            let mail = directory.list_recent_mail(&slots.token).await?;
            if mail.is_empty() {
                cx.send_text(NO_RECENT_MAIL);
            } else {
                let cards = mail.iter().take(MAIL_LIMIT).map(mail_card).collect();
                cx.turn.send(OutboundMessage::carousel(cards));
            }
        }
        intents::CHECK_LICENSES => {
            let licenses = directory.list_licenses(&slots.token).await?;
            if licenses.is_empty() {
                cx.send_text(NO_LICENSES);
            } else {
                let cards = licenses.iter().map(license_card).collect();
                cx.turn.send(OutboundMessage::carousel(cards));
            }
        }
        intents::SEND_MAIL => cx.send_text(NOT_ENABLED),
        intents::CREATE_USER => {
            return Ok(Directive::delegate(DialogOptions::CreateUser(slots)));
        }
        intents::REMOVE_USER => {
            return Ok(Directive::delegate(DialogOptions::RemoveUser(slots)));
        }
        other => {
            if let Some(action) = UserAction::from_intent(other) {
                return Ok(Directive::delegate(DialogOptions::DomainName(
                    DomainNameOptions { slots, action },
                )));
            }
            cx.send_text(NOT_UNDERSTOOD);
            cx.send_text(CAPABILITIES);
        }
    }

    Ok(Directive::Next(Value::Null))
}

#[async_trait]
impl Dialog for RouterDialog {
    fn kind(&self) -> DialogKind {
        DialogKind::Router
    }

    fn step_count(&self) -> usize {
        5
    }

    async fn step(
        &self,
        index: usize,
        cx: &mut StepContext<'_>,
    ) -> Result<Directive, StepFailure> {
        match index {
            Self::PROMPT_LOGIN => {
                let status = cx
                    .services
                    .auth
                    .acquire_token(cx.turn.conversation_id())
                    .await?;
                Ok(match status {
                    TokenStatus::Token(token) => Directive::Next(token_value(&token)),
                    TokenStatus::NeedsLogin => login_prompt(cx),
                })
            }
            Self::LOGIN_RESULT => {
                if resolve_token(cx).await?.is_some() {
                    Ok(Directive::prompt_text(ASK_COMMAND))
                } else {
                    cx.send_text(LOGIN_FAILED);
                    Ok(Directive::Complete(Value::Bool(false)))
                }
            }
            Self::COMMAND => {
                let command = match cx.received.clone().into_value() {
                    Value::String(text) => text.trim().to_string(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                cx.values.set(COMMAND_KEY, Value::String(command));

                // The token is never cached; ask again on every command
                let status = cx
                    .services
                    .auth
                    .acquire_token(cx.turn.conversation_id())
                    .await?;
                Ok(match status {
                    TokenStatus::Token(token) => Directive::Next(token_value(&token)),
                    TokenStatus::NeedsLogin => login_prompt(cx),
                })
            }
            Self::CLASSIFY_AND_DISPATCH => classify_and_dispatch(cx).await,
            Self::FINALIZE => {
                cx.send_text(ANOTHER_COMMAND);
                Ok(Directive::Complete(Value::Null))
            }
            _ => Err(EngineError::StepOutOfRange {
                kind: DialogKind::Router,
                index: i64::try_from(index).unwrap_or(i64::MAX),
            }
            .into()),
        }
    }
}
