//! Remove-user dialog: name, domain, confirmation card, remove

use super::directive::Directive;
use super::engine::{Dialog, EngineError, StepContext, StepFailure};
use super::options::{DialogOptions, SlotOptions};
use super::slots::{self, NamePrompt};
use super::stack::DialogKind;
use crate::activity::OutboundMessage;
use crate::services::{rendered_attachment, CardTemplate, CollaboratorError};
use async_trait::async_trait;
use serde_json::Value;

const ACTION: &str = "remove the user";

/// Choice-set input on the confirmation card
const SELECTION_KEY: &str = "SingleSelectVal";
/// Selection code meaning "remove"
const REMOVE_SELECTION: i64 = 2;

pub struct RemoveUserDialog;

impl RemoveUserDialog {
    const COLLECT_NAME: usize = 0;
    const COLLECT_DOMAIN: usize = 1;
    const CONFIRM: usize = 2;
    const PROCESS: usize = 3;
}

fn slot_options<'o>(options: &'o DialogOptions) -> Result<&'o SlotOptions, EngineError> {
    match options {
        DialogOptions::RemoveUser(slots) => Ok(slots),
        other => Err(EngineError::OptionsMismatch {
            kind: DialogKind::RemoveUser,
            options: other.kind(),
        }),
    }
}

/// True when the confirmation reply selected removal, as number or numeric text
fn confirmed(selection: Option<&Value>) -> bool {
    match selection {
        Some(Value::Number(n)) => n.as_i64() == Some(REMOVE_SELECTION),
        Some(Value::String(s)) => s.trim().parse::<i64>() == Ok(REMOVE_SELECTION),
        _ => false,
    }
}

fn confirmation_template(opts: &SlotOptions) -> Result<String, CollaboratorError> {
    match &opts.card {
        Some(card) => serde_json::to_string(&card.content)
            .map_err(|e| CollaboratorError::rendering(format!("Remove card is invalid: {e}"))),
        None => CardTemplate::RemoveUser.template_json(),
    }
}

#[async_trait]
impl Dialog for RemoveUserDialog {
    fn kind(&self) -> DialogKind {
        DialogKind::RemoveUser
    }

    fn step_count(&self) -> usize {
        4
    }

    async fn step(
        &self,
        index: usize,
        cx: &mut StepContext<'_>,
    ) -> Result<Directive, StepFailure> {
        let options = cx.options;
        let opts = slot_options(options)?;

        match index {
            Self::COLLECT_NAME => Ok(slots::collect_name(cx, opts, NamePrompt::Example)),
            Self::COLLECT_DOMAIN => Ok(slots::collect_domain(cx, opts)?),
            Self::CONFIRM => {
                let profile = slots::merge_domain(cx)?;
                let template = confirmation_template(opts)?;
                let data = profile.template_data().to_string();
                let rendered = cx.services.renderer.render(&template, &data)?;
                let card = rendered_attachment(&rendered)?;
                Ok(Directive::Prompt(OutboundMessage::card(card)))
            }
            Self::PROCESS => {
                let profile = slots::load_profile(cx.values);
                let selection = cx
                    .received
                    .reply()
                    .and_then(|reply| reply.value_object())
                    .and_then(|fields| fields.get(SELECTION_KEY));

                if !confirmed(selection) {
                    let name = profile
                        .domain_name_prefix()
                        .unwrap_or_else(|| "The user".to_string());
                    cx.send_text(format!("{name} is not getting deleted"));
                    return Ok(Directive::Complete(Value::Null));
                }

                let upn = profile.require_principal(ACTION)?;
                let outcome = cx
                    .services
                    .directory
                    .remove_user(&opts.token, &upn)
                    .await?;
                tracing::info!(conv_id = %cx.conversation_id(), upn = %upn, ?outcome, "User removed");
                slots::report_write(cx, &upn, "REMOVED", outcome);
                Ok(Directive::Complete(Value::Null))
            }
            _ => Err(EngineError::StepOutOfRange {
                kind: DialogKind::RemoveUser,
                index: i64::try_from(index).unwrap_or(i64::MAX),
            }
            .into()),
        }
    }
}
