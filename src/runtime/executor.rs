//! Turn executor
//!
//! One invocation per inbound activity: load the stack, run the engine on a
//! working copy, then commit the stack once and append the transcript.

use super::traits::Storage;
use crate::activity::{InboundActivity, OutboundMessage};
use crate::dialog::{
    DialogEngine, DialogKind, DialogOptions, DialogSet, DialogStack, EngineError, Services,
    StackStatus,
};
use crate::turn::TurnContext;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// Interruption text that signs the user out from any point
const LOGOUT_COMMAND: &str = "logout";
pub const SIGNED_OUT: &str = "You have been signed out.";

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Dialog engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("Storage error: {0}")]
    Storage(String),
}

/// What one committed turn produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutcome {
    pub messages: Vec<OutboundMessage>,
    /// The top frame is suspended on a prompt
    pub waiting: bool,
    pub depth: usize,
}

fn is_logout(activity: &InboundActivity) -> bool {
    activity
        .trimmed_text()
        .is_some_and(|t| t.eq_ignore_ascii_case(LOGOUT_COMMAND))
}

/// Generic turn runtime that can work with any storage implementation
pub struct DialogRuntime<S: Storage> {
    storage: S,
    dialogs: Arc<DialogSet>,
    services: Services,
}

impl<S: Storage> DialogRuntime<S> {
    pub fn new(storage: S, dialogs: Arc<DialogSet>, services: Services) -> Self {
        Self {
            storage,
            dialogs,
            services,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Run one turn. Nothing is saved unless the engine finishes cleanly.
    pub async fn handle_turn(
        &self,
        conv_id: &str,
        activity: InboundActivity,
    ) -> Result<TurnOutcome, RuntimeError> {
        let mut stack = self
            .storage
            .load_stack(conv_id)
            .await
            .map_err(RuntimeError::Storage)?;
        let mut turn = TurnContext::new(conv_id, activity);

        if is_logout(turn.activity()) {
            tracing::info!(conv_id = %conv_id, depth = stack.depth(), "Logout requested");
            self.sign_out(conv_id).await;
            stack.clear();
            turn.send_text(SIGNED_OUT);
        } else {
            let engine = DialogEngine::new(&self.dialogs, &self.services);
            let status = if stack.is_empty() {
                engine
                    .begin(&mut stack, &mut turn, DialogKind::Router, DialogOptions::Router)
                    .await
            } else {
                engine.continue_top(&mut stack, &mut turn).await
            };

            match status {
                Ok(StackStatus::Waiting) => {
                    tracing::debug!(conv_id = %conv_id, depth = stack.depth(), "Turn suspended");
                }
                Ok(StackStatus::Empty { result }) => {
                    tracing::debug!(conv_id = %conv_id, %result, "Root dialog completed");
                }
                Err(e) => {
                    tracing::error!(conv_id = %conv_id, error = %e, "Turn aborted");
                    return Err(e.into());
                }
            }
        }

        self.commit(conv_id, &stack, turn).await
    }

    /// Sign out and drop any dialog in progress
    pub async fn logout(&self, conv_id: &str) -> Result<(), RuntimeError> {
        self.sign_out(conv_id).await;
        self.storage
            .save_stack(conv_id, &DialogStack::new())
            .await
            .map_err(RuntimeError::Storage)?;
        tracing::info!(conv_id = %conv_id, "Signed out");
        Ok(())
    }

    async fn sign_out(&self, conv_id: &str) {
        if let Err(e) = self.services.auth.sign_out(conv_id).await {
            tracing::warn!(conv_id = %conv_id, error = %e, "Sign-out failed");
        }
    }

    async fn commit(
        &self,
        conv_id: &str,
        stack: &DialogStack,
        turn: TurnContext,
    ) -> Result<TurnOutcome, RuntimeError> {
        self.storage
            .save_stack(conv_id, stack)
            .await
            .map_err(RuntimeError::Storage)?;

        let inbound = turn.activity().clone();
        let messages = turn.into_outbox();

        // The stack is already committed; a lost transcript entry is not fatal
        if let Err(e) = self
            .storage
            .append_turn(conv_id, &inbound, &messages)
            .await
        {
            tracing::warn!(conv_id = %conv_id, error = %e, "Failed to append transcript");
        }

        Ok(TurnOutcome {
            messages,
            waiting: stack.is_waiting(),
            depth: stack.depth(),
        })
    }
}
