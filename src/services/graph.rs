//! Microsoft Graph directory client

use super::{
    AccessToken, CollaboratorError, DirectoryService, DirectoryUser, License, MailMessage,
    NewUser, Service, WriteMode, WriteOutcome,
};
use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Number of inbox messages fetched for the recent mail listing
const RECENT_MAIL_COUNT: u32 = 5;

/// Graph collection envelope
#[derive(Debug, Deserialize)]
struct Collection<T> {
    value: Vec<T>,
}

/// Directory service backed by the Graph REST API
pub struct GraphDirectory {
    client: Client,
    base_url: Url,
    write_mode: WriteMode,
}

impl GraphDirectory {
    pub fn new(base_url: &str, write_mode: WriteMode) -> Result<Self, CollaboratorError> {
        let base_url = Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
            CollaboratorError::unavailable(Service::Directory, format!("Invalid base URL: {e}"))
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                CollaboratorError::unavailable(
                    Service::Directory,
                    format!("Failed to create HTTP client: {e}"),
                )
            })?;
        Ok(Self {
            client,
            base_url,
            write_mode,
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, CollaboratorError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                CollaboratorError::unavailable(Service::Directory, "Base URL cannot take a path")
            })?
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        token: &AccessToken,
        body: Option<&Value>,
    ) -> Result<String, CollaboratorError> {
        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(&token.token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                CollaboratorError::unavailable(Service::Directory, format!("Request timeout: {e}"))
            } else {
                CollaboratorError::unavailable(Service::Directory, format!("Request failed: {e}"))
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            CollaboratorError::unavailable(
                Service::Directory,
                format!("Failed to read response: {e}"),
            )
        })?;

        if !status.is_success() {
            return Err(CollaboratorError::from_status(
                Service::Directory,
                status.as_u16(),
                &body,
            ));
        }
        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        token: &AccessToken,
    ) -> Result<T, CollaboratorError> {
        let body = self.send(Method::GET, url, token, None).await?;
        serde_json::from_str(&body).map_err(|e| {
            CollaboratorError::invalid_response(
                Service::Directory,
                format!("Failed to parse response: {e}"),
            )
        })
    }

    async fn write(
        &self,
        method: Method,
        url: Url,
        token: &AccessToken,
        body: Option<&Value>,
    ) -> Result<WriteOutcome, CollaboratorError> {
        match self.write_mode {
            WriteMode::Simulate => {
                tracing::info!(%method, %url, "Simulating directory write");
                Ok(WriteOutcome::Simulated)
            }
            WriteMode::Live => {
                self.send(method, url, token, body).await?;
                Ok(WriteOutcome::Applied)
            }
        }
    }

    async fn set_account_enabled(
        &self,
        token: &AccessToken,
        upn: &str,
        enabled: bool,
    ) -> Result<WriteOutcome, CollaboratorError> {
        let url = self.url(&["users", upn])?;
        let body = json!({ "accountEnabled": enabled });
        self.write(Method::PATCH, url, token, Some(&body)).await
    }
}

#[async_trait]
impl DirectoryService for GraphDirectory {
    async fn get_user(
        &self,
        token: &AccessToken,
        upn: &str,
    ) -> Result<DirectoryUser, CollaboratorError> {
        let url = self.url(&["users", upn])?;
        self.get_json(url, token).await
    }

    async fn create_user(
        &self,
        token: &AccessToken,
        user: &NewUser,
    ) -> Result<WriteOutcome, CollaboratorError> {
        let url = self.url(&["users"])?;
        let body = serde_json::to_value(user).map_err(|e| {
            CollaboratorError::invalid_response(Service::Directory, format!("Invalid user: {e}"))
        })?;
        self.write(Method::POST, url, token, Some(&body)).await
    }

    async fn remove_user(
        &self,
        token: &AccessToken,
        upn: &str,
    ) -> Result<WriteOutcome, CollaboratorError> {
        let url = self.url(&["users", upn])?;
        self.write(Method::DELETE, url, token, None).await
    }

    async fn disable_user(
        &self,
        token: &AccessToken,
        upn: &str,
    ) -> Result<WriteOutcome, CollaboratorError> {
        self.set_account_enabled(token, upn, false).await
    }

    async fn enable_user(
        &self,
        token: &AccessToken,
        upn: &str,
    ) -> Result<WriteOutcome, CollaboratorError> {
        self.set_account_enabled(token, upn, true).await
    }

    async fn list_me(&self, token: &AccessToken) -> Result<DirectoryUser, CollaboratorError> {
        let url = self.url(&["me"])?;
        self.get_json(url, token).await
    }

    async fn list_recent_mail(
        &self,
        token: &AccessToken,
    ) -> Result<Vec<MailMessage>, CollaboratorError> {
        let mut url = self.url(&["me", "mailFolders", "inbox", "messages"])?;
        url.query_pairs_mut()
            .append_pair("$top", &RECENT_MAIL_COUNT.to_string())
            .append_pair("$filter", "isRead eq false");
        let page: Collection<MailMessage> = self.get_json(url, token).await?;
        Ok(page.value)
    }

    async fn list_licenses(&self, token: &AccessToken) -> Result<Vec<License>, CollaboratorError> {
        let url = self.url(&["subscribedSkus"])?;
        let page: Collection<License> = self.get_json(url, token).await?;
        Ok(page.value)
    }
}
