//! Resolve a user by domain name, then get, disable or enable them

use super::directive::Directive;
use super::engine::{Dialog, EngineError, StepContext, StepFailure};
use super::options::{DialogOptions, DomainNameOptions, UserAction};
use super::slots::{self, NamePrompt};
use super::stack::DialogKind;
use crate::activity::{Attachment, OutboundMessage};
use crate::services::{
    rendered_attachment, CardTemplate, CollaboratorError, DirectoryUser, TemplateRenderer,
};
use async_trait::async_trait;
use serde_json::Value;

pub struct DomainNameDialog;

impl DomainNameDialog {
    const COLLECT_NAME: usize = 0;
    const COLLECT_DOMAIN: usize = 1;
    const PROCESS: usize = 2;
}

fn domain_options(options: &DialogOptions) -> Result<&DomainNameOptions, EngineError> {
    match options {
        DialogOptions::DomainName(opts) => Ok(opts),
        other => Err(EngineError::OptionsMismatch {
            kind: DialogKind::DomainName,
            options: other.kind(),
        }),
    }
}

/// Render the user details card for a looked-up user
fn user_card(
    renderer: &dyn TemplateRenderer,
    opts: &DomainNameOptions,
    user: &DirectoryUser,
) -> Result<Attachment, CollaboratorError> {
    let template = match &opts.slots.card {
        Some(card) => serde_json::to_string(&card.content)
            .map_err(|e| CollaboratorError::rendering(format!("User card is invalid: {e}")))?,
        None => CardTemplate::GetUser.template_json()?,
    };
    let data = serde_json::to_string(user)
        .map_err(|e| CollaboratorError::rendering(format!("User data is invalid: {e}")))?;
    let rendered = renderer.render(&template, &data)?;
    rendered_attachment(&rendered)
}

#[async_trait]
impl Dialog for DomainNameDialog {
    fn kind(&self) -> DialogKind {
        DialogKind::DomainName
    }

    fn step_count(&self) -> usize {
        3
    }

    async fn step(
        &self,
        index: usize,
        cx: &mut StepContext<'_>,
    ) -> Result<Directive, StepFailure> {
        let options = cx.options;
        let opts = domain_options(options)?;

        match index {
            Self::COLLECT_NAME => Ok(slots::collect_name(cx, &opts.slots, NamePrompt::Example)),
            Self::COLLECT_DOMAIN => Ok(slots::collect_domain(cx, &opts.slots)?),
            Self::PROCESS => {
                let profile = slots::merge_domain(cx)?;
                let upn = profile.require_principal(opts.action.verb())?;
                let token = &opts.slots.token;
                let services = cx.services;
                let directory = &services.directory;

                tracing::info!(
                    conv_id = %cx.conversation_id(),
                    upn = %upn,
                    action = opts.action.intent(),
                    "Running user action"
                );

                match opts.action {
                    UserAction::Get => {
                        let user = directory.get_user(token, &upn).await?;
                        let card = user_card(services.renderer.as_ref(), opts, &user)?;
                        cx.turn.send(OutboundMessage::card(card));
                    }
                    UserAction::Disable => {
                        let outcome = directory.disable_user(token, &upn).await?;
                        slots::report_write(cx, &upn, "DISABLED", outcome);
                    }
                    UserAction::Enable => {
                        let outcome = directory.enable_user(token, &upn).await?;
                        slots::report_write(cx, &upn, "ENABLED", outcome);
                    }
                }
                Ok(Directive::Complete(Value::Null))
            }
            _ => Err(EngineError::StepOutOfRange {
                kind: DialogKind::DomainName,
                index: i64::try_from(index).unwrap_or(i64::MAX),
            }
            .into()),
        }
    }
}
