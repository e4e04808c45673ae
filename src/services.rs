//! External collaborators
//!
//! Narrow async interfaces for everything the dialogs call out to:
//! sign-in, intent classification, the directory, and card templating.

mod cards;
mod error;
mod graph;
mod luis;
mod session_auth;
mod templating;
mod types;

pub use cards::{login_card, rendered_attachment, CardTemplate};
pub use error::{CollaboratorError, Service};
pub use graph::{GraphDirectory, DEFAULT_GRAPH_BASE_URL};
pub use luis::{LuisClassifier, LuisConfig, StaticClassifier};
pub use session_auth::SessionTokenStore;
pub use templating::AdaptiveTemplateRenderer;
pub use types::*;

#[cfg(test)]
pub use luis::NONE_INTENT;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Hands out directory credentials for a conversation
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Return the current token, or `NeedsLogin` if the user must sign in
    async fn acquire_token(&self, conversation_id: &str) -> Result<TokenStatus, CollaboratorError>;

    /// Forget any credential held for the conversation
    async fn sign_out(&self, conversation_id: &str) -> Result<(), CollaboratorError>;
}

/// Classifies an utterance into an intent label and entities
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, utterance: &str) -> Result<IntentPrediction, CollaboratorError>;
}

/// Directory operations available to dialogs
#[async_trait]
pub trait DirectoryService: Send + Sync {
    async fn get_user(&self, token: &AccessToken, upn: &str)
        -> Result<DirectoryUser, CollaboratorError>;

    async fn create_user(
        &self,
        token: &AccessToken,
        user: &NewUser,
    ) -> Result<WriteOutcome, CollaboratorError>;

    async fn remove_user(&self, token: &AccessToken, upn: &str)
        -> Result<WriteOutcome, CollaboratorError>;

    async fn disable_user(
        &self,
        token: &AccessToken,
        upn: &str,
    ) -> Result<WriteOutcome, CollaboratorError>;

    async fn enable_user(&self, token: &AccessToken, upn: &str)
        -> Result<WriteOutcome, CollaboratorError>;

    async fn list_me(&self, token: &AccessToken) -> Result<DirectoryUser, CollaboratorError>;

    async fn list_recent_mail(
        &self,
        token: &AccessToken,
    ) -> Result<Vec<MailMessage>, CollaboratorError>;

    async fn list_licenses(&self, token: &AccessToken) -> Result<Vec<License>, CollaboratorError>;
}

/// Renders a card template against a data document. Pure.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template_json: &str, data_json: &str) -> Result<String, CollaboratorError>;
}

/// Logging wrapper for the directory service
pub struct LoggingDirectory {
    inner: Arc<dyn DirectoryService>,
}

impl LoggingDirectory {
    pub fn new(inner: Arc<dyn DirectoryService>) -> Self {
        Self { inner }
    }
}

fn log_call<T>(operation: &str, start: Instant, result: &Result<T, CollaboratorError>) {
    let duration = start.elapsed();
    match result {
        Ok(_) => tracing::info!(
            operation,
            duration_ms = %duration.as_millis(),
            "Directory call completed"
        ),
        Err(e) => tracing::error!(
            operation,
            duration_ms = %duration.as_millis(),
            error = %e.message,
            kind = ?e.kind,
            "Directory call failed"
        ),
    }
}

#[async_trait]
impl DirectoryService for LoggingDirectory {
    async fn get_user(
        &self,
        token: &AccessToken,
        upn: &str,
    ) -> Result<DirectoryUser, CollaboratorError> {
        let start = Instant::now();
        let result = self.inner.get_user(token, upn).await;
        log_call("get_user", start, &result);
        result
    }

    async fn create_user(
        &self,
        token: &AccessToken,
        user: &NewUser,
    ) -> Result<WriteOutcome, CollaboratorError> {
        let start = Instant::now();
        let result = self.inner.create_user(token, user).await;
        log_call("create_user", start, &result);
        result
    }

    async fn remove_user(
        &self,
        token: &AccessToken,
        upn: &str,
    ) -> Result<WriteOutcome, CollaboratorError> {
        let start = Instant::now();
        let result = self.inner.remove_user(token, upn).await;
        log_call("remove_user", start, &result);
        result
    }

    async fn disable_user(
        &self,
        token: &AccessToken,
        upn: &str,
    ) -> Result<WriteOutcome, CollaboratorError> {
        let start = Instant::now();
        let result = self.inner.disable_user(token, upn).await;
        log_call("disable_user", start, &result);
        result
    }

    async fn enable_user(
        &self,
        token: &AccessToken,
        upn: &str,
    ) -> Result<WriteOutcome, CollaboratorError> {
        let start = Instant::now();
        let result = self.inner.enable_user(token, upn).await;
        log_call("enable_user", start, &result);
        result
    }

    async fn list_me(&self, token: &AccessToken) -> Result<DirectoryUser, CollaboratorError> {
        let start = Instant::now();
        let result = self.inner.list_me(token).await;
        log_call("list_me", start, &result);
        result
    }

    async fn list_recent_mail(
        &self,
        token: &AccessToken,
    ) -> Result<Vec<MailMessage>, CollaboratorError> {
        let start = Instant::now();
        let result = self.inner.list_recent_mail(token).await;
        log_call("list_recent_mail", start, &result);
        result
    }

    async fn list_licenses(&self, token: &AccessToken) -> Result<Vec<License>, CollaboratorError> {
        let start = Instant::now();
        let result = self.inner.list_licenses(token).await;
        log_call("list_licenses", start, &result);
        result
    }
}
