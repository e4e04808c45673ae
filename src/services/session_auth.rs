//! Per-conversation token store fed by the OAuth callback

use super::{AccessToken, CollaboratorError, TokenProvider, TokenStatus};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Holds the most recent token deposited for each conversation.
///
/// Tokens arrive through the login callback endpoint. An expired token is
/// dropped on read and reported as `NeedsLogin`.
#[derive(Default)]
pub struct SessionTokenStore {
    tokens: RwLock<HashMap<String, AccessToken>>,
}

impl SessionTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a token obtained by the sign-in flow
    pub async fn deposit(&self, conversation_id: &str, token: AccessToken) {
        tracing::info!(conv_id = %conversation_id, expires_at = ?token.expires_at, "Token deposited");
        self.tokens
            .write()
            .await
            .insert(conversation_id.to_string(), token);
    }
}

#[async_trait]
impl TokenProvider for SessionTokenStore {
    async fn acquire_token(&self, conversation_id: &str) -> Result<TokenStatus, CollaboratorError> {
        let now = Utc::now();
        {
            let tokens = self.tokens.read().await;
            match tokens.get(conversation_id) {
                None => return Ok(TokenStatus::NeedsLogin),
                Some(token) if !token.is_expired(now) => {
                    return Ok(TokenStatus::Token(token.clone()))
                }
                Some(_) => {}
            }
        }

        tracing::debug!(conv_id = %conversation_id, "Dropping expired token");
        self.tokens.write().await.remove(conversation_id);
        Ok(TokenStatus::NeedsLogin)
    }

    async fn sign_out(&self, conversation_id: &str) -> Result<(), CollaboratorError> {
        self.tokens.write().await.remove(conversation_id);
        Ok(())
    }
}
