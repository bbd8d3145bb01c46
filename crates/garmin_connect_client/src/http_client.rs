//! HTTP client implementation for the Garmin Connect API.
//!
//! This module provides a reqwest-based implementation of the [`GarminClient`](crate::GarminClient) trait.

use crate::config::Config;
use crate::observability::{record_api_result, record_login};
use crate::sso::{self, OAuthConsumer};
use crate::tokens::{self, TokenSet};
use crate::{
    ActivityEvaluation, ActivityId, ActivityRecord, DownloadFormat, GarminClient, GarminError,
    Login,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::Path;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

const USER_AGENT: &str = "GCM-iOS-5.7.2.1";
/// Page size used when walking the activity list.
pub const PAGE_SIZE: usize = 20;

/// Client for the Garmin Connect API using reqwest.
#[derive(Debug)]
pub struct ReqwestGarminClient {
    api_url: String,
    sso_url: String,
    client: reqwest::Client,
    session: RwLock<Option<TokenSet>>,
}

impl ReqwestGarminClient {
    /// Create a new client instance without a session.
    ///
    /// # Arguments
    /// * `api_url` - Base URL of the Connect API (e.g., "https://connectapi.garmin.com")
    /// * `sso_url` - Base URL of the SSO service (e.g., "https://sso.garmin.com")
    pub fn new(api_url: &str, sso_url: &str) -> Result<Self, GarminError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            sso_url: sso_url.trim_end_matches('/').to_string(),
            client,
            session: RwLock::new(None),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, GarminError> {
        Self::new(&config.api_url, &config.sso_url)
    }

    /// Install a session directly, skipping the login flow.
    pub async fn with_session(self, tokens: TokenSet) -> Self {
        *self.session.write().await = Some(tokens);
        self
    }

    async fn bearer(&self) -> Result<String, GarminError> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|t| format!("Bearer {}", t.oauth2.access_token))
            .ok_or_else(|| GarminError::Auth("not logged in".into()))
    }

    /// Build an authenticated GET request.
    async fn get_request(&self, path: &str) -> Result<reqwest::RequestBuilder, GarminError> {
        let url = format!("{}{}", self.api_url, path);
        Ok(self
            .client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, self.bearer().await?))
    }

    /// Execute a request and expect a JSON response.
    async fn execute_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, GarminError> {
        let resp = self.send(endpoint, request).await?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Send a request, converting non-success status codes into errors.
    async fn send(
        &self,
        endpoint: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, GarminError> {
        let resp = request.send().await.inspect_err(|_| {
            record_api_result(endpoint, false);
        })?;
        let status = resp.status();
        record_api_result(endpoint, status.is_success());
        if !status.is_success() {
            return Err(Self::error_from_response(resp).await);
        }
        Ok(resp)
    }

    /// Extract error information from a failed response.
    async fn error_from_response(resp: reqwest::Response) -> GarminError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        let body_snippet: String = body.chars().take(256).collect();
        GarminError::from_status(status, body_snippet)
    }

    async fn resume(&self, token_store: &Path) -> Result<(), GarminError> {
        let mut tokens = tokens::load(token_store).await?;
        if tokens.oauth2.is_expired_at(chrono::Utc::now().timestamp()) {
            let oauth1 = tokens.oauth1.as_ref().ok_or_else(|| {
                GarminError::Auth("cached OAuth2 token expired and no OAuth1 token to renew it".into())
            })?;
            debug!("refreshing expired OAuth2 token");
            tokens.oauth2 =
                sso::exchange(&self.client, &self.api_url, &OAuthConsumer::default(), oauth1)
                    .await?;
        }
        *self.session.write().await = Some(tokens);
        Ok(())
    }

    async fn fresh_login(&self, credentials: &crate::Credentials) -> Result<(), GarminError> {
        let tokens = sso::login(&self.client, &self.sso_url, &self.api_url, credentials).await?;
        *self.session.write().await = Some(tokens);
        Ok(())
    }
}

#[async_trait]
impl GarminClient for ReqwestGarminClient {
    async fn login(&self, login: Login<'_>) -> Result<(), GarminError> {
        let (method, result) = match login {
            Login::TokenStore(dir) => ("token_store", self.resume(dir).await),
            Login::Credentials(creds) => ("credentials", self.fresh_login(creds).await),
        };
        // A session only counts once the API accepts it.
        let result = match result {
            Ok(()) => self.get_full_name().await.map(|name| {
                info!("authenticated as {name}");
            }),
            Err(e) => Err(e),
        };
        record_login(method, result.is_ok());
        if result.is_err() {
            *self.session.write().await = None;
        }
        result
    }

    async fn save_session(&self, token_store: &Path) -> Result<(), GarminError> {
        let session = self.session.read().await;
        let tokens = session
            .as_ref()
            .ok_or_else(|| GarminError::Auth("no session to save".into()))?;
        tokens::save(token_store, tokens).await
    }

    async fn get_full_name(&self) -> Result<String, GarminError> {
        #[derive(serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct SocialProfile {
            full_name: Option<String>,
            display_name: Option<String>,
        }

        let request = self.get_request("/userprofile-service/socialProfile").await?;
        let profile: SocialProfile = self.execute_json("profile", request).await?;
        profile
            .full_name
            .or(profile.display_name)
            .ok_or_else(|| GarminError::Auth("profile carries no name".into()))
    }

    async fn get_activities_by_date(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        activity_type: Option<&str>,
    ) -> Result<Vec<ActivityRecord>, GarminError> {
        let path = "/activitylist-service/activities/search/activities";
        let mut activities = Vec::new();
        let mut offset = 0usize;
        loop {
            let mut pairs: Vec<(&str, String)> = vec![
                ("startDate", start.to_string()),
                ("endDate", end.to_string()),
                ("start", offset.to_string()),
                ("limit", PAGE_SIZE.to_string()),
            ];
            if let Some(kind) = activity_type {
                pairs.push(("activityType", kind.to_string()));
            }
            let qp: Vec<(&str, &str)> = pairs.iter().map(|(k, v)| (*k, v.as_str())).collect();

            let request = self.get_request(path).await?.query(&qp);
            let page: Vec<ActivityRecord> = self.execute_json("activities", request).await?;
            let fetched = page.len();
            debug!(offset, fetched, "fetched activity page");
            activities.extend(page);
            if fetched < PAGE_SIZE {
                break;
            }
            offset += fetched;
        }
        Ok(activities)
    }

    async fn get_activity_evaluation(
        &self,
        activity_id: &ActivityId,
    ) -> Result<ActivityEvaluation, GarminError> {
        let path = format!("/activity-service/activity/{activity_id}");
        let request = self.get_request(&path).await?;
        self.execute_json("activity", request).await
    }

    async fn download_activity(
        &self,
        activity_id: &ActivityId,
        format: DownloadFormat,
    ) -> Result<Vec<u8>, GarminError> {
        let request = self.get_request(&format.download_path(activity_id)).await?;
        let resp = self.send("download", request).await?;
        Ok(resp.bytes().await?.to_vec())
    }
}
