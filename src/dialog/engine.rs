//! Step runtime for the dialog stack
//!
//! The engine never touches storage. It mutates a working copy of the
//! stack handed in by the caller, which decides whether to commit it.

use super::directive::{Directive, Received};
use super::options::DialogOptions;
use super::profile::{ProfileError, UnknownFieldPolicy};
use super::stack::{DialogKind, DialogStack, Frame, Values, NOT_STARTED};
use crate::services::{
    CollaboratorError, DirectoryService, IntentClassifier, TemplateRenderer, TokenProvider,
};
use crate::turn::TurnContext;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Defects in how dialogs were wired or resumed. A turn that hits one
/// of these is aborted without saving.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Dialog kind not registered: {0}")]
    UnknownDialogKind(DialogKind),
    #[error("No active dialog to continue")]
    NoActiveDialog,
    #[error("Top dialog {0} is not waiting for input")]
    NotAwaitingInput(DialogKind),
    #[error("Options for {options} passed to dialog {kind}")]
    OptionsMismatch {
        kind: DialogKind,
        options: DialogKind,
    },
    #[error("Dialog {kind} has no step {index}")]
    StepOutOfRange { kind: DialogKind, index: i64 },
}

/// Why a step could not produce a directive
#[derive(Debug, Clone, Error)]
pub enum StepFailure {
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Where the stack stands after the engine hands control back
#[derive(Debug, Clone, PartialEq)]
pub enum StackStatus {
    /// Top frame prompted and waits for the next turn
    Waiting,
    /// The root dialog completed
    Empty { result: Value },
}

/// Tunables the dialogs read at run time
#[derive(Debug, Clone)]
pub struct DialogSettings {
    /// OAuth connection the login card refers to
    pub connection_name: String,
    pub login_timeout: Duration,
    pub unknown_fields: UnknownFieldPolicy,
}

impl Default for DialogSettings {
    fn default() -> Self {
        Self {
            connection_name: "graph".to_string(),
            login_timeout: Duration::from_secs(300),
            unknown_fields: UnknownFieldPolicy::Ignore,
        }
    }
}

/// Collaborators available to every step
#[derive(Clone)]
pub struct Services {
    pub auth: Arc<dyn TokenProvider>,
    pub nlu: Arc<dyn IntentClassifier>,
    pub directory: Arc<dyn DirectoryService>,
    pub renderer: Arc<dyn TemplateRenderer>,
    pub settings: DialogSettings,
}

/// Everything one step may read or change
pub struct StepContext<'a> {
    pub turn: &'a mut TurnContext,
    pub services: &'a Services,
    pub options: &'a DialogOptions,
    pub values: &'a mut Values,
    pub received: Received,
}

impl StepContext<'_> {
    pub fn conversation_id(&self) -> &str {
        self.turn.conversation_id()
    }

    pub fn send_text(&mut self, text: impl Into<String>) {
        self.turn.send_text(text);
    }
}

/// A fixed, ordered list of steps
#[async_trait]
pub trait Dialog: Send + Sync {
    fn kind(&self) -> DialogKind;

    fn step_count(&self) -> usize;

    /// Run step `index`; indices are always below `step_count`
    async fn step(&self, index: usize, cx: &mut StepContext<'_>)
        -> Result<Directive, StepFailure>;
}

/// Registry of dialog implementations by kind
#[derive(Default, Clone)]
pub struct DialogSet {
    dialogs: HashMap<DialogKind, Arc<dyn Dialog>>,
}

impl DialogSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, dialog: Arc<dyn Dialog>) {
        self.dialogs.insert(dialog.kind(), dialog);
    }

    pub fn with(mut self, dialog: Arc<dyn Dialog>) -> Self {
        self.register(dialog);
        self
    }

    pub fn get(&self, kind: DialogKind) -> Result<&Arc<dyn Dialog>, EngineError> {
        self.dialogs
            .get(&kind)
            .ok_or(EngineError::UnknownDialogKind(kind))
    }
}

/// Runs dialog steps against a working stack
pub struct DialogEngine<'a> {
    dialogs: &'a DialogSet,
    services: &'a Services,
}

impl<'a> DialogEngine<'a> {
    pub fn new(dialogs: &'a DialogSet, services: &'a Services) -> Self {
        Self { dialogs, services }
    }

    /// Push a new frame and run it until it prompts or the stack empties
    pub async fn begin(
        &self,
        stack: &mut DialogStack,
        turn: &mut TurnContext,
        kind: DialogKind,
        options: DialogOptions,
    ) -> Result<StackStatus, EngineError> {
        self.push_frame(stack, kind, options)?;
        self.run(stack, turn, Received::Nothing).await
    }

    /// Resume the suspended top frame with the turn's inbound activity
    pub async fn continue_top(
        &self,
        stack: &mut DialogStack,
        turn: &mut TurnContext,
    ) -> Result<StackStatus, EngineError> {
        let frame = stack.top_mut().ok_or(EngineError::NoActiveDialog)?;
        if !frame.awaiting_input {
            return Err(EngineError::NotAwaitingInput(frame.kind));
        }
        frame.awaiting_input = false;
        let reply = Received::Reply(turn.activity().clone());
        self.run(stack, turn, reply).await
    }

    fn push_frame(
        &self,
        stack: &mut DialogStack,
        kind: DialogKind,
        options: DialogOptions,
    ) -> Result<(), EngineError> {
        self.dialogs.get(kind)?;
        if options.kind() != kind {
            return Err(EngineError::OptionsMismatch {
                kind,
                options: options.kind(),
            });
        }
        tracing::debug!(dialog = %kind, depth = stack.depth() + 1, "Beginning dialog");
        stack.push(Frame::new(kind, options));
        Ok(())
    }

    #[allow(clippy::too_many_lines)]
    async fn run(
        &self,
        stack: &mut DialogStack,
        turn: &mut TurnContext,
        mut received: Received,
    ) -> Result<StackStatus, EngineError> {
        loop {
            let Some(frame) = stack.top_mut() else {
                return Ok(StackStatus::Empty {
                    result: received.into_value(),
                });
            };
            let kind = frame.kind;
            let dialog = Arc::clone(self.dialogs.get(kind)?);
            let index = frame.next_step();
            let step_count = dialog.step_count();

            if frame.cursor < NOT_STARTED || index > step_count {
                return Err(EngineError::StepOutOfRange {
                    kind,
                    index: i64::from(frame.cursor) + 1,
                });
            }

            // Ran out of steps: the frame completes with whatever it last received
            if index == step_count {
                stack.pop();
                tracing::debug!(dialog = %kind, "Dialog completed after last step");
                received = Received::Value(received.into_value());
                continue;
            }

            frame.cursor = i32::try_from(index).map_err(|_| EngineError::StepOutOfRange {
                kind,
                index: i64::MAX,
            })?;
            let options = frame.options.clone();
            let mut values = std::mem::take(&mut frame.values);

            tracing::debug!(
                conv_id = %turn.conversation_id(),
                dialog = %kind,
                step = index,
                "Running dialog step"
            );

            let outcome = {
                let mut cx = StepContext {
                    turn: &mut *turn,
                    services: self.services,
                    options: &options,
                    values: &mut values,
                    received,
                };
                dialog.step(index, &mut cx).await
            };

            if let Ok(directive) = &outcome {
                tracing::debug!(
                    dialog = %kind,
                    step = index,
                    directive = directive.name(),
                    "Step returned"
                );
            }

            if let Some(frame) = stack.top_mut() {
                frame.values = values;
            }

            match outcome {
                Ok(Directive::Prompt(message)) => {
                    turn.send(message);
                    if let Some(frame) = stack.top_mut() {
                        frame.awaiting_input = true;
                    }
                    return Ok(StackStatus::Waiting);
                }
                Ok(Directive::Next(value)) => {
                    received = Received::Value(value);
                }
                Ok(Directive::Delegate { kind, options }) => {
                    self.push_frame(stack, kind, options)?;
                    received = Received::Nothing;
                }
                Ok(Directive::Complete(value)) => {
                    stack.pop();
                    tracing::debug!(dialog = %kind, "Dialog completed");
                    received = Received::Value(value);
                }
                Err(StepFailure::Engine(e)) => return Err(e),
                Err(failure) => {
                    tracing::warn!(
                        conv_id = %turn.conversation_id(),
                        dialog = %kind,
                        step = index,
                        error = %failure,
                        "Dialog step failed, ending dialog"
                    );
                    turn.send_text(failure_message(&failure));
                    stack.pop();
                    received = Received::Value(Value::Null);
                }
            }
        }
    }
}

fn failure_message(failure: &StepFailure) -> String {
    match failure {
        StepFailure::Collaborator(e) => e.user_message(),
        StepFailure::Profile(e) => e.user_message(),
        StepFailure::Engine(e) => e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{InboundActivity, OutboundMessage};
    use crate::runtime::testing::test_services;
    use crate::services::Service;
    use serde_json::json;

    type StepFn = fn(&mut StepContext<'_>) -> Result<Directive, StepFailure>;

    /// Scripted dialog running plain functions as steps
    struct Scripted {
        kind: DialogKind,
        steps: Vec<StepFn>,
    }

    #[async_trait]
    impl Dialog for Scripted {
        fn kind(&self) -> DialogKind {
            self.kind
        }

        fn step_count(&self) -> usize {
            self.steps.len()
        }

        async fn step(
            &self,
            index: usize,
            cx: &mut StepContext<'_>,
        ) -> Result<Directive, StepFailure> {
            (self.steps[index])(cx)
        }
    }

    fn ask(cx: &mut StepContext<'_>) -> Result<Directive, StepFailure> {
        cx.values.set("asked", json!(true));
        Ok(Directive::prompt_text("question?"))
    }

    fn echo(cx: &mut StepContext<'_>) -> Result<Directive, StepFailure> {
        let answer = cx.received.reply_text().unwrap_or_default().to_string();
        Ok(Directive::Next(json!(answer)))
    }

    fn finish(cx: &mut StepContext<'_>) -> Result<Directive, StepFailure> {
        let value = cx.received.clone().into_value();
        cx.send_text(format!("got {value}"));
        Ok(Directive::Complete(value))
    }

    fn delegate(_cx: &mut StepContext<'_>) -> Result<Directive, StepFailure> {
        Ok(Directive::Delegate {
            kind: DialogKind::CreateUser,
            options: DialogOptions::Router,
        })
    }

    fn fail(_cx: &mut StepContext<'_>) -> Result<Directive, StepFailure> {
        Err(CollaboratorError::unavailable(Service::Directory, "down").into())
    }

    fn dialogs(root: Vec<StepFn>) -> DialogSet {
        DialogSet::new().with(Arc::new(Scripted {
            kind: DialogKind::Router,
            steps: root,
        }))
    }

    #[tokio::test]
    async fn test_prompt_suspends_and_reply_resumes_next_step() {
        let set = dialogs(vec![ask as StepFn, echo, finish]);
        let services = test_services();
        let engine = DialogEngine::new(&set, &services);
        let mut stack = DialogStack::new();

        let mut turn = TurnContext::new("c1", InboundActivity::text("hi"));
        let status = engine
            .begin(&mut stack, &mut turn, DialogKind::Router, DialogOptions::Router)
            .await
            .unwrap();
        assert_eq!(status, StackStatus::Waiting);
        assert_eq!(turn.outbox(), &[OutboundMessage::text("question?")]);
        let top = stack.top().unwrap();
        assert_eq!(top.cursor, 0);
        assert!(top.awaiting_input);
        assert_eq!(top.values.get("asked"), Some(&json!(true)));

        let mut turn = TurnContext::new("c1", InboundActivity::text(" answer "));
        let status = engine.continue_top(&mut stack, &mut turn).await.unwrap();
        assert_eq!(
            status,
            StackStatus::Empty {
                result: json!("answer")
            }
        );
        assert!(stack.is_empty());
        assert_eq!(turn.outbox(), &[OutboundMessage::text("got \"answer\"")]);
    }

    #[tokio::test]
    async fn test_last_next_completes_frame() {
        let set = dialogs(vec![ask as StepFn, echo]);
        let services = test_services();
        let engine = DialogEngine::new(&set, &services);
        let mut stack = DialogStack::new();
        let mut turn = TurnContext::new("c1", InboundActivity::default());
        engine
            .begin(&mut stack, &mut turn, DialogKind::Router, DialogOptions::Router)
            .await
            .unwrap();

        let mut turn = TurnContext::new("c1", InboundActivity::text("done"));
        let status = engine.continue_top(&mut stack, &mut turn).await.unwrap();
        assert_eq!(status, StackStatus::Empty { result: json!("done") });
    }

    #[tokio::test]
    async fn test_continue_requires_suspended_top() {
        let set = dialogs(vec![ask as StepFn]);
        let services = test_services();
        let engine = DialogEngine::new(&set, &services);

        let mut empty = DialogStack::new();
        let mut turn = TurnContext::new("c1", InboundActivity::text("x"));
        assert_eq!(
            engine.continue_top(&mut empty, &mut turn).await,
            Err(EngineError::NoActiveDialog)
        );

        let mut stack = DialogStack::new();
        stack.push(Frame::new(DialogKind::Router, DialogOptions::Router));
        let before = stack.clone();
        assert_eq!(
            engine.continue_top(&mut stack, &mut turn).await,
            Err(EngineError::NotAwaitingInput(DialogKind::Router))
        );
        assert_eq!(stack, before);
        assert!(turn.outbox().is_empty());
    }

    #[tokio::test]
    async fn test_begin_rejects_unknown_kind_and_mismatched_options() {
        let set = dialogs(vec![ask as StepFn]);
        let services = test_services();
        let engine = DialogEngine::new(&set, &services);
        let mut stack = DialogStack::new();
        let mut turn = TurnContext::new("c1", InboundActivity::default());

        let err = engine
            .begin(&mut stack, &mut turn, DialogKind::RemoveUser, DialogOptions::Router)
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::UnknownDialogKind(DialogKind::RemoveUser));

        let set = set.with(Arc::new(Scripted {
            kind: DialogKind::CreateUser,
            steps: vec![finish as StepFn],
        }));
        let engine = DialogEngine::new(&set, &services);
        let err = engine
            .begin(&mut stack, &mut turn, DialogKind::CreateUser, DialogOptions::Router)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::OptionsMismatch {
                kind: DialogKind::CreateUser,
                options: DialogKind::Router,
            }
        );
        assert!(stack.is_empty());
    }

    #[tokio::test]
    async fn test_delegate_with_wrong_options_aborts_turn() {
        let set = dialogs(vec![delegate as StepFn]).with(Arc::new(Scripted {
            kind: DialogKind::CreateUser,
            steps: vec![finish as StepFn],
        }));
        let services = test_services();
        let engine = DialogEngine::new(&set, &services);
        let mut stack = DialogStack::new();
        let mut turn = TurnContext::new("c1", InboundActivity::default());
        let err = engine
            .begin(&mut stack, &mut turn, DialogKind::Router, DialogOptions::Router)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::OptionsMismatch { .. }));
    }

    #[tokio::test]
    async fn test_collaborator_failure_completes_frame_with_apology() {
        let set = dialogs(vec![fail as StepFn, finish]);
        let services = test_services();
        let engine = DialogEngine::new(&set, &services);
        let mut stack = DialogStack::new();
        let mut turn = TurnContext::new("c1", InboundActivity::default());
        let status = engine
            .begin(&mut stack, &mut turn, DialogKind::Router, DialogOptions::Router)
            .await
            .unwrap();
        assert_eq!(status, StackStatus::Empty { result: Value::Null });
        assert_eq!(turn.outbox().len(), 1);
        assert!(turn.outbox()[0]
            .text
            .as_deref()
            .unwrap()
            .contains("the directory"));
    }

    #[tokio::test]
    async fn test_corrupt_cursor_is_out_of_range() {
        let set = dialogs(vec![ask as StepFn]);
        let services = test_services();
        let engine = DialogEngine::new(&set, &services);
        let mut stack = DialogStack::new();
        let mut frame = Frame::new(DialogKind::Router, DialogOptions::Router);
        frame.cursor = 5;
        frame.awaiting_input = true;
        stack.push(frame);
        let mut turn = TurnContext::new("c1", InboundActivity::text("x"));
        assert_eq!(
            engine.continue_top(&mut stack, &mut turn).await,
            Err(EngineError::StepOutOfRange {
                kind: DialogKind::Router,
                index: 6,
            })
        );
    }
}
