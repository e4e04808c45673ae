//! Mock implementations for testing
//!
//! These mocks enable end-to-end turn tests without real I/O.

use super::executor::{DialogRuntime, RuntimeError, TurnOutcome};
use super::traits::*;
use crate::activity::{InboundActivity, OutboundMessage};
use crate::db::TranscriptEntry;
use crate::dialog::{DialogSet, DialogSettings, DialogStack, Services};
use crate::services::{
    AccessToken, AdaptiveTemplateRenderer, CollaboratorError, DirectoryService, DirectoryUser,
    IntentClassifier, IntentPrediction, License, MailMessage, NewUser, TokenProvider,
    TokenStatus, WriteOutcome, NONE_INTENT,
};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Mock Token Provider
// ============================================================================

/// Token provider that is either signed in or not
pub struct MockTokenProvider {
    token: Mutex<Option<AccessToken>>,
    sign_outs: Mutex<Vec<String>>,
}

impl MockTokenProvider {
    pub fn signed_in() -> Self {
        Self {
            token: Mutex::new(Some(AccessToken::new("test-token", None))),
            sign_outs: Mutex::new(Vec::new()),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            token: Mutex::new(None),
            sign_outs: Mutex::new(Vec::new()),
        }
    }

    /// Simulate the OAuth callback completing
    pub fn sign_in(&self) {
        *self.token.lock().unwrap() = Some(AccessToken::new("test-token", None));
    }

    /// Lose the token as if it expired upstream
    pub fn expire(&self) {
        *self.token.lock().unwrap() = None;
    }

    pub fn recorded_sign_outs(&self) -> Vec<String> {
        self.sign_outs.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenProvider for MockTokenProvider {
    async fn acquire_token(&self, _conversation_id: &str) -> Result<TokenStatus, CollaboratorError> {
        Ok(match self.token.lock().unwrap().clone() {
            Some(token) => TokenStatus::Token(token),
            None => TokenStatus::NeedsLogin,
        })
    }

    async fn sign_out(&self, conversation_id: &str) -> Result<(), CollaboratorError> {
        self.sign_outs
            .lock()
            .unwrap()
            .push(conversation_id.to_string());
        *self.token.lock().unwrap() = None;
        Ok(())
    }
}

// ============================================================================
// Mock Classifier
// ============================================================================

/// Classifier that returns queued predictions, then `None`
pub struct MockClassifier {
    responses: Mutex<VecDeque<Result<IntentPrediction, CollaboratorError>>>,
    utterances: Mutex<Vec<String>>,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            utterances: Mutex::new(Vec::new()),
        }
    }

    pub fn queue(&self, prediction: IntentPrediction) {
        self.responses.lock().unwrap().push_back(Ok(prediction));
    }

    pub fn queue_error(&self, error: CollaboratorError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_utterances(&self) -> Vec<String> {
        self.utterances.lock().unwrap().clone()
    }
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IntentClassifier for MockClassifier {
    async fn classify(&self, utterance: &str) -> Result<IntentPrediction, CollaboratorError> {
        self.utterances.lock().unwrap().push(utterance.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(IntentPrediction::new(NONE_INTENT)))
    }
}

// ============================================================================
// Mock Directory
// ============================================================================

/// One recorded directory call
#[derive(Debug, Clone, PartialEq)]
pub enum DirectoryCall {
    GetUser(String),
    CreateUser(NewUser),
    RemoveUser(String),
    DisableUser(String),
    EnableUser(String),
    ListMe,
    ListRecentMail,
    ListLicenses,
}

/// Directory that records every call and simulates writes
pub struct MockDirectory {
    calls: Mutex<Vec<DirectoryCall>>,
    failures: Mutex<VecDeque<CollaboratorError>>,
    me: Mutex<DirectoryUser>,
    mail: Mutex<Vec<MailMessage>>,
    licenses: Mutex<Vec<License>>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
            me: Mutex::new(DirectoryUser {
                display_name: Some("Test User".into()),
                user_principal_name: Some("testuser@hogent.be".into()),
                ..DirectoryUser::default()
            }),
            mail: Mutex::new(Vec::new()),
            licenses: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<DirectoryCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Make the next call fail with this error
    pub fn fail_next(&self, error: CollaboratorError) {
        self.failures.lock().unwrap().push_back(error);
    }

    pub fn set_mail(&self, mail: Vec<MailMessage>) {
        *self.mail.lock().unwrap() = mail;
    }

    pub fn set_licenses(&self, licenses: Vec<License>) {
        *self.licenses.lock().unwrap() = licenses;
    }

    fn record(&self, call: DirectoryCall) -> Result<(), CollaboratorError> {
        self.calls.lock().unwrap().push(call);
        match self.failures.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Default for MockDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DirectoryService for MockDirectory {
    async fn get_user(
        &self,
        _token: &AccessToken,
        upn: &str,
    ) -> Result<DirectoryUser, CollaboratorError> {
        self.record(DirectoryCall::GetUser(upn.to_string()))?;
        Ok(DirectoryUser {
            id: Some("user-1".into()),
            display_name: Some(upn.to_string()),
            user_principal_name: Some(upn.to_string()),
            account_enabled: Some(true),
            ..DirectoryUser::default()
        })
    }

    async fn create_user(
        &self,
        _token: &AccessToken,
        user: &NewUser,
    ) -> Result<WriteOutcome, CollaboratorError> {
        self.record(DirectoryCall::CreateUser(user.clone()))?;
        Ok(WriteOutcome::Simulated)
    }

    async fn remove_user(
        &self,
        _token: &AccessToken,
        upn: &str,
    ) -> Result<WriteOutcome, CollaboratorError> {
        self.record(DirectoryCall::RemoveUser(upn.to_string()))?;
        Ok(WriteOutcome::Simulated)
    }

    async fn disable_user(
        &self,
        _token: &AccessToken,
        upn: &str,
    ) -> Result<WriteOutcome, CollaboratorError> {
        self.record(DirectoryCall::DisableUser(upn.to_string()))?;
        Ok(WriteOutcome::Simulated)
    }

    async fn enable_user(
        &self,
        _token: &AccessToken,
        upn: &str,
    ) -> Result<WriteOutcome, CollaboratorError> {
        self.record(DirectoryCall::EnableUser(upn.to_string()))?;
        Ok(WriteOutcome::Simulated)
    }

    async fn list_me(&self, _token: &AccessToken) -> Result<DirectoryUser, CollaboratorError> {
        self.record(DirectoryCall::ListMe)?;
        Ok(self.me.lock().unwrap().clone())
    }

    async fn list_recent_mail(
        &self,
        _token: &AccessToken,
    ) -> Result<Vec<MailMessage>, CollaboratorError> {
        self.record(DirectoryCall::ListRecentMail)?;
        Ok(self.mail.lock().unwrap().clone())
    }

    async fn list_licenses(&self, _token: &AccessToken) -> Result<Vec<License>, CollaboratorError> {
        self.record(DirectoryCall::ListLicenses)?;
        Ok(self.licenses.lock().unwrap().clone())
    }
}

// ============================================================================
// In-Memory Storage
// ============================================================================

/// In-memory storage for testing
#[derive(Default)]
pub struct InMemoryStorage {
    stacks: Mutex<HashMap<String, DialogStack>>,
    transcripts: Mutex<HashMap<String, Vec<TranscriptEntry>>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a stack without counting it as a save
    pub fn set_stack(&self, conv_id: &str, stack: DialogStack) {
        self.stacks
            .lock()
            .unwrap()
            .insert(conv_id.to_string(), stack);
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl StackStore for InMemoryStorage {
    async fn load_stack(&self, conv_id: &str) -> Result<DialogStack, String> {
        Ok(self
            .stacks
            .lock()
            .unwrap()
            .get(conv_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_stack(&self, conv_id: &str, stack: &DialogStack) -> Result<(), String> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err("disk full".to_string());
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.set_stack(conv_id, stack.clone());
        Ok(())
    }
}

#[async_trait]
impl TranscriptStore for InMemoryStorage {
    async fn append_turn(
        &self,
        conv_id: &str,
        inbound: &InboundActivity,
        outbound: &[OutboundMessage],
    ) -> Result<TranscriptEntry, String> {
        let mut transcripts = self.transcripts.lock().unwrap();
        let entries = transcripts.entry(conv_id.to_string()).or_default();
        let entry = TranscriptEntry {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conv_id.to_string(),
            sequence_id: i64::try_from(entries.len()).unwrap() + 1,
            inbound: inbound.clone(),
            outbound: outbound.to_vec(),
            created_at: Utc::now(),
        };
        entries.push(entry.clone());
        Ok(entry)
    }

    async fn get_transcript(&self, conv_id: &str) -> Result<Vec<TranscriptEntry>, String> {
        Ok(self
            .transcripts
            .lock()
            .unwrap()
            .get(conv_id)
            .cloned()
            .unwrap_or_default())
    }
}

// ============================================================================
// Test Runtime
// ============================================================================

/// Services backed by fresh mocks, signed in
pub fn test_services() -> Services {
    Services {
        auth: Arc::new(MockTokenProvider::signed_in()),
        nlu: Arc::new(MockClassifier::new()),
        directory: Arc::new(MockDirectory::new()),
        renderer: Arc::new(AdaptiveTemplateRenderer::new()),
        settings: DialogSettings::default(),
    }
}

pub struct TestRuntimeBuilder {
    auth: MockTokenProvider,
    settings: DialogSettings,
}

impl TestRuntimeBuilder {
    pub fn auth(mut self, auth: MockTokenProvider) -> Self {
        self.auth = auth;
        self
    }

    pub fn settings(mut self, settings: DialogSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> TestRuntime {
        let auth = Arc::new(self.auth);
        let nlu = Arc::new(MockClassifier::new());
        let directory = Arc::new(MockDirectory::new());
        let storage = Arc::new(InMemoryStorage::new());

        let services = Services {
            auth: auth.clone(),
            nlu: nlu.clone(),
            directory: directory.clone(),
            renderer: Arc::new(AdaptiveTemplateRenderer::new()),
            settings: self.settings,
        };
        let runtime = DialogRuntime::new(storage.clone(), Arc::new(DialogSet::standard()), services);

        TestRuntime {
            auth,
            nlu,
            directory,
            storage,
            runtime,
        }
    }
}

/// A full turn runtime over mocks, talking in a single conversation
pub struct TestRuntime {
    pub auth: Arc<MockTokenProvider>,
    pub nlu: Arc<MockClassifier>,
    pub directory: Arc<MockDirectory>,
    pub storage: Arc<InMemoryStorage>,
    runtime: DialogRuntime<Arc<InMemoryStorage>>,
}

impl TestRuntime {
    pub const CONV_ID: &'static str = "test-conv";

    pub fn builder() -> TestRuntimeBuilder {
        TestRuntimeBuilder {
            auth: MockTokenProvider::signed_in(),
            settings: DialogSettings::default(),
        }
    }

    pub async fn try_send(&self, activity: InboundActivity) -> Result<TurnOutcome, RuntimeError> {
        self.runtime.handle_turn(Self::CONV_ID, activity).await
    }

    pub async fn send_text(&self, text: &str) -> TurnOutcome {
        self.try_send(InboundActivity::text(text))
            .await
            .expect("turn should commit")
    }

    pub async fn send_value(&self, value: Value) -> TurnOutcome {
        self.try_send(InboundActivity::value(value))
            .await
            .expect("turn should commit")
    }

    pub async fn stack(&self) -> DialogStack {
        self.storage.load_stack(Self::CONV_ID).await.unwrap()
    }

    pub async fn transcript(&self) -> Vec<TranscriptEntry> {
        self.storage.get_transcript(Self::CONV_ID).await.unwrap()
    }
}

// ============================================================================
// Liveness
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::DialogKind;
    use crate::services::IntentPrediction;
    use serde_json::json;

    /// Scripted answers drive each dialog kind back to an empty stack
    #[tokio::test]
    async fn test_every_dialog_kind_terminates() {
        let scripts: Vec<(IntentPrediction, Vec<Value>)> = vec![
            (
                IntentPrediction::new("Create User"),
                vec![
                    json!({ "GivenName": "Ann", "SurName": "Lee" }),
                    json!({ "Domain": "@hogent.be" }),
                ],
            ),
            (
                IntentPrediction::new("Remove User"),
                vec![json!("annlee"), json!({ "Domain": "@hogent.be" }), json!({ "SingleSelectVal": 1 })],
            ),
            (
                IntentPrediction::new("Enable User"),
                vec![json!("annlee"), json!({ "Domain": "@hogent.be" })],
            ),
        ];

        for (prediction, replies) in scripts {
            let rt = TestRuntime::builder().build();
            rt.nlu.queue(prediction.clone());
            rt.send_text("hello").await;
            let mut outcome = rt.send_text("do it").await;
            assert_eq!(outcome.depth, 2, "{}", prediction.intent);

            for reply in replies {
                outcome = match reply {
                    Value::String(text) => rt.send_text(&text).await,
                    other => rt.send_value(other).await,
                };
            }
            assert_eq!(outcome.depth, 0, "{}", prediction.intent);
            assert!(rt.stack().await.is_empty());
        }
    }

    #[tokio::test]
    async fn test_remove_declined_never_removes() {
        let rt = TestRuntime::builder().build();
        rt.nlu
            .queue(IntentPrediction::new("Remove User").with_entity("DomainName", "annlee"));
        rt.send_text("hello").await;
        rt.send_text("remove annlee").await;
        let confirm = rt.send_value(json!({ "Domain": "@hogent.be" })).await;
        assert!(confirm.waiting);
        assert_eq!(rt.stack().await.top().unwrap().kind, DialogKind::RemoveUser);

        let outcome = rt.send_value(json!({ "SingleSelectVal": "1" })).await;
        assert_eq!(
            outcome.messages[0].text.as_deref(),
            Some("annlee is not getting deleted")
        );
        assert!(rt.directory.calls().is_empty());
    }

    #[tokio::test]
    async fn test_recent_mail_carousel_is_capped() {
        let rt = TestRuntime::builder().build();
        rt.directory.set_mail(vec![MailMessage::default(); 7]);
        rt.nlu.queue(IntentPrediction::new("Recent"));
        rt.send_text("hello").await;
        let outcome = rt.send_text("recent mail").await;
        assert_eq!(outcome.messages[0].attachments.len(), 5);
    }

    #[tokio::test]
    async fn test_in_memory_storage_counts_saves() {
        let storage = InMemoryStorage::new();
        storage.set_stack("c", DialogStack::new());
        assert_eq!(storage.save_count(), 0);
        storage.save_stack("c", &DialogStack::new()).await.unwrap();
        assert_eq!(storage.save_count(), 1);
    }
}
