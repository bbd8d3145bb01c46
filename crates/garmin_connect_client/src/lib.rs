//! `GarminClient` trait, wire types and a reqwest-based Garmin Connect client.

use async_trait::async_trait;
use chrono::NaiveDate;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

pub mod config;
pub mod fake;
pub mod format;
pub mod http_client;
pub mod observability;
pub mod sso;
pub mod tokens;

pub use format::DownloadFormat;

#[derive(Debug, Error)]
pub enum GarminError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("rate limited by Garmin Connect: {0}")]
    RateLimited(String),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration error: {0}")]
    Config(String),
}

impl GarminError {
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => GarminError::Auth(body),
            404 => GarminError::NotFound(body),
            429 => GarminError::RateLimited(body),
            _ => GarminError::Status { status, body },
        }
    }
}

/// Activity identifier. Garmin sends it as a JSON number, fixtures and the
/// command line use strings; both end up here as text.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ActivityId(String);

impl ActivityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActivityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<u64> for ActivityId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for ActivityId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => Ok(Self(s)),
            serde_json::Value::Number(n) => Ok(Self(n.to_string())),
            other => Err(D::Error::custom(format!(
                "expected string or number, got {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityType {
    pub type_key: String,
}

/// One entry of the activity list endpoint. Only the fields the backup needs
/// are kept; everything else in the payload is ignored.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub activity_id: ActivityId,
    #[serde(default)]
    pub activity_name: Option<String>,
    pub start_time_local: String,
    #[serde(default)]
    pub activity_type: Option<ActivityType>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummaryDto {
    pub start_time_local: String,
}

/// Detail payload of a single activity, where the start time lives in the
/// nested summary rather than at the top level.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvaluation {
    pub activity_id: ActivityId,
    #[serde(default)]
    pub activity_name: Option<String>,
    #[serde(rename = "summaryDTO")]
    pub summary: ActivitySummaryDto,
    #[serde(default, rename = "activityTypeDTO")]
    pub activity_type: Option<ActivityType>,
}

impl From<ActivityEvaluation> for ActivityRecord {
    fn from(eval: ActivityEvaluation) -> Self {
        Self {
            activity_id: eval.activity_id,
            activity_name: eval.activity_name,
            start_time_local: eval.summary.start_time_local,
            activity_type: eval.activity_type,
        }
    }
}

/// Username and password for a fresh SSO login.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

/// How a session is established.
#[derive(Clone, Copy, Debug)]
pub enum Login<'a> {
    /// Resume from OAuth tokens cached in a directory.
    TokenStore(&'a Path),
    /// Run the SSO flow with a username and password.
    Credentials(&'a Credentials),
}

#[async_trait]
pub trait GarminClient: Send + Sync {
    async fn login(&self, login: Login<'_>) -> Result<(), GarminError>;

    /// Persist the current session tokens so the next run can resume them.
    async fn save_session(&self, token_store: &Path) -> Result<(), GarminError>;

    async fn get_full_name(&self) -> Result<String, GarminError>;

    /// Activities whose local start date falls in `start..=end`, in the order
    /// Garmin returns them.
    async fn get_activities_by_date(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        activity_type: Option<&str>,
    ) -> Result<Vec<ActivityRecord>, GarminError>;

    async fn get_activity_evaluation(
        &self,
        activity_id: &ActivityId,
    ) -> Result<ActivityEvaluation, GarminError>;

    async fn download_activity(
        &self,
        activity_id: &ActivityId,
        format: DownloadFormat,
    ) -> Result<Vec<u8>, GarminError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn activity_id_from_number() {
        let payload = json!({"activityId": 10000001, "startTimeLocal": "2023-11-06 07:17:39"});
        let rec: ActivityRecord = serde_json::from_value(payload).expect("deserialize number id");
        assert_eq!(rec.activity_id.as_str(), "10000001");
        assert_eq!(rec.activity_name, None);
    }

    #[test]
    fn activity_id_invalid_type_errors() {
        let payload = json!({"activityId": {"nested": true}, "startTimeLocal": "2023-11-06 07:17:39"});
        let res: Result<ActivityRecord, _> = serde_json::from_value(payload);
        assert!(res.is_err());
    }

    #[test]
    fn evaluation_converts_to_record_using_summary_start() {
        let payload = json!({
            "activityId": 42,
            "activityName": "Morning Ride",
            "summaryDTO": {"startTimeLocal": "2024-03-01T06:45:12.0", "distance": 1000.0},
            "activityTypeDTO": {"typeKey": "cycling"}
        });
        let eval: ActivityEvaluation = serde_json::from_value(payload).expect("evaluation");
        let rec = ActivityRecord::from(eval);
        assert_eq!(rec.activity_id, ActivityId::from(42u64));
        assert_eq!(rec.start_time_local, "2024-03-01T06:45:12.0");
        assert_eq!(rec.activity_type.map(|t| t.type_key).as_deref(), Some("cycling"));
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(GarminError::from_status(401, String::new()), GarminError::Auth(_)));
        assert!(matches!(GarminError::from_status(404, String::new()), GarminError::NotFound(_)));
        assert!(matches!(
            GarminError::from_status(429, String::new()),
            GarminError::RateLimited(_)
        ));
        assert!(matches!(
            GarminError::from_status(500, "boom".into()),
            GarminError::Status { status: 500, .. }
        ));
    }
}
