//! Create-user dialog: name card, domain choice, create

use super::directive::Directive;
use super::engine::{Dialog, EngineError, StepContext, StepFailure};
use super::options::{DialogOptions, SlotOptions};
use super::profile::UserProfile;
use super::slots::{self, NamePrompt};
use super::stack::DialogKind;
use crate::services::{CardTemplate, NewUser, PasswordProfile};
use async_trait::async_trait;
use rand::distributions::{Alphanumeric, DistString};
use rand::Rng;
use serde_json::Value;

const ACTION: &str = "create the user";
const CARD_INSTRUCTION: &str = "Please fill in the details of the new user.";

pub struct CreateUserDialog;

impl CreateUserDialog {
    const COLLECT_NAME: usize = 0;
    const COLLECT_DOMAIN: usize = 1;
    const PROCESS: usize = 2;
}

fn slot_options<'o>(options: &'o DialogOptions) -> Result<&'o SlotOptions, EngineError> {
    match options {
        DialogOptions::CreateUser(slots) => Ok(slots),
        other => Err(EngineError::OptionsMismatch {
            kind: DialogKind::CreateUser,
            options: other.kind(),
        }),
    }
}

/// Random initial password; the user must change it at first sign-in
fn generate_password() -> String {
    let mut rng = rand::thread_rng();
    let body = Alphanumeric.sample_string(&mut rng, 12);
    let digits: u8 = rng.gen_range(10..100);
    format!("{body}#{digits}")
}

/// Directory payload for a collected profile
pub fn new_user(profile: &UserProfile, upn: String) -> NewUser {
    let nickname = profile.domain_name_prefix().unwrap_or_default();
    let full_name = [profile.given_name.as_deref(), profile.sur_name.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    let display_name = profile
        .display_name
        .clone()
        .or_else(|| (!full_name.is_empty()).then_some(full_name))
        .unwrap_or_else(|| nickname.clone());

    NewUser {
        account_enabled: profile.account_enabled.unwrap_or(true),
        display_name,
        mail_nickname: nickname,
        user_principal_name: upn,
        given_name: profile.given_name.clone(),
        surname: profile.sur_name.clone(),
        department: profile.department.clone(),
        job_title: profile.job_title.clone(),
        mobile_phone: profile.phone_number.clone(),
        password_profile: PasswordProfile {
            force_change_password_next_sign_in: true,
            password: profile.password.clone().unwrap_or_else(generate_password),
        },
    }
}

/// Summary of the payload with the password masked
fn summary(user: &NewUser) -> String {
    let mut shown = user.clone();
    shown.password_profile.password = "********".to_string();
    serde_json::to_string_pretty(&shown).unwrap_or_default()
}

#[async_trait]
impl Dialog for CreateUserDialog {
    fn kind(&self) -> DialogKind {
        DialogKind::CreateUser
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
        let opts = slot_options(options)?;

        match index {
            Self::COLLECT_NAME => {
                let card = match &opts.card {
                    Some(card) => card.clone(),
                    None => CardTemplate::CreateUser.attachment()?,
                };
                let prompt = NamePrompt::Card {
                    instruction: CARD_INSTRUCTION,
                    card,
                };
                Ok(slots::collect_name(cx, opts, prompt))
            }
            Self::COLLECT_DOMAIN => Ok(slots::collect_domain(cx, opts)?),
            Self::PROCESS => {
                let profile = slots::merge_domain(cx)?;
                let upn = profile.require_principal(ACTION)?;
                let user = new_user(&profile, upn.clone());

                let outcome = cx
                    .services
                    .directory
                    .create_user(&opts.token, &user)
                    .await?;
                tracing::info!(conv_id = %cx.conversation_id(), upn = %upn, ?outcome, "User created");

                slots::report_write(cx, &upn, "CREATED", outcome);
                cx.send_text(summary(&user));
                Ok(Directive::Complete(Value::Null))
            }
            _ => Err(EngineError::StepOutOfRange {
                kind: DialogKind::CreateUser,
                index: i64::try_from(index).unwrap_or(i64::MAX),
            }
            .into()),
        }
    }
}
