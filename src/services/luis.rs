//! LUIS intent classifier

use super::{CollaboratorError, Entity, IntentClassifier, IntentPrediction, Service};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;

/// Intent label used when nothing matched
pub const NONE_INTENT: &str = "None";

/// Connection settings for a LUIS application
#[derive(Debug, Clone)]
pub struct LuisConfig {
    pub app_id: String,
    pub key: String,
    pub endpoint: String,
}

impl LuisConfig {
    /// Read from `LUIS_APP_ID`, `LUIS_KEY`, `LUIS_ENDPOINT`; `None` if any is missing
    pub fn from_env() -> Option<Self> {
        Some(Self {
            app_id: std::env::var("LUIS_APP_ID").ok()?,
            key: std::env::var("LUIS_KEY").ok()?,
            endpoint: std::env::var("LUIS_ENDPOINT").ok()?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LuisResponse {
    top_scoring_intent: Option<LuisIntent>,
    #[serde(default)]
    entities: Vec<LuisEntity>,
}

#[derive(Debug, Deserialize)]
struct LuisIntent {
    intent: String,
}

#[derive(Debug, Deserialize)]
struct LuisEntity {
    entity: String,
    #[serde(rename = "type")]
    kind: String,
}

impl From<LuisResponse> for IntentPrediction {
    fn from(response: LuisResponse) -> Self {
        IntentPrediction {
            intent: response
                .top_scoring_intent
                .map_or_else(|| NONE_INTENT.to_string(), |i| i.intent),
            entities: response
                .entities
                .into_iter()
                .map(|e| Entity::new(e.kind, e.entity))
                .collect(),
        }
    }
}

/// Classifier backed by the LUIS v2 prediction endpoint
pub struct LuisClassifier {
    client: Client,
    config: LuisConfig,
}

impl LuisClassifier {
    pub fn new(config: LuisConfig) -> Result<Self, CollaboratorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| {
                CollaboratorError::unavailable(
                    Service::Nlu,
                    format!("Failed to create HTTP client: {e}"),
                )
            })?;
        Ok(Self { client, config })
    }

    fn prediction_url(&self, utterance: &str) -> Result<Url, CollaboratorError> {
        let base = format!(
            "{}/luis/v2.0/apps/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.app_id
        );
        let mut url = Url::parse(&base).map_err(|e| {
            CollaboratorError::unavailable(Service::Nlu, format!("Invalid endpoint: {e}"))
        })?;
        url.query_pairs_mut()
            .append_pair("subscription-key", &self.config.key)
            .append_pair("verbose", "false")
            .append_pair("q", utterance);
        Ok(url)
    }
}

#[async_trait]
impl IntentClassifier for LuisClassifier {
    async fn classify(&self, utterance: &str) -> Result<IntentPrediction, CollaboratorError> {
        let url = self.prediction_url(utterance)?;
        let response = self.client.get(url).send().await.map_err(|e| {
            CollaboratorError::unavailable(Service::Nlu, format!("Request failed: {e}"))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            CollaboratorError::unavailable(Service::Nlu, format!("Failed to read response: {e}"))
        })?;

        if !status.is_success() {
            return Err(CollaboratorError::from_status(
                Service::Nlu,
                status.as_u16(),
                &body,
            ));
        }

        let parsed: LuisResponse = serde_json::from_str(&body).map_err(|e| {
            CollaboratorError::invalid_response(
                Service::Nlu,
                format!("Failed to parse response: {e}"),
            )
        })?;
        let prediction = IntentPrediction::from(parsed);
        tracing::debug!(
            intent = %prediction.intent,
            entities = prediction.entities.len(),
            "Utterance classified"
        );
        Ok(prediction)
    }
}

/// Classifier that always answers with the same intent.
///
/// Used when no LUIS application is configured, so every command falls
/// through to the "don't understand" branch.
pub struct StaticClassifier {
    intent: String,
}

impl StaticClassifier {
    pub fn new(intent: impl Into<String>) -> Self {
        Self {
            intent: intent.into(),
        }
    }
}

impl Default for StaticClassifier {
    fn default() -> Self {
        Self::new(NONE_INTENT)
    }
}

#[async_trait]
impl IntentClassifier for StaticClassifier {
    async fn classify(&self, _utterance: &str) -> Result<IntentPrediction, CollaboratorError> {
        Ok(IntentPrediction::new(self.intent.clone()))
    }
}
