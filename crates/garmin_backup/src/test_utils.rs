//! Scriptable `GarminClient` used by the unit tests.
//!
//! Every call is recorded as a short string so tests can assert on the exact
//! sequence of API traffic a backup run produces.
#![cfg(test)]

use async_trait::async_trait;
use chrono::NaiveDate;
use garmin_connect_client::{
    ActivityEvaluation, ActivityId, ActivityRecord, ActivitySummaryDto, DownloadFormat,
    GarminClient, GarminError, Login,
};
use secrecy::ExposeSecret;
use std::path::Path;
use std::sync::Mutex;

/// Build a list record the way the activity search returns it.
pub fn record(id: &str, name: Option<&str>, start: &str) -> ActivityRecord {
    ActivityRecord {
        activity_id: ActivityId::from(id),
        activity_name: name.map(str::to_string),
        start_time_local: start.to_string(),
        activity_type: None,
    }
}

pub struct MockClient {
    records: Vec<ActivityRecord>,
    calls: Mutex<Vec<String>>,
    /// Downloads of this id fail with a server error.
    pub fail_download: Option<ActivityId>,
    pub token_store_ok: bool,
    /// Password the credential login accepts.
    pub accepted_password: Option<String>,
    pub save_fails: bool,
}

impl MockClient {
    pub fn with_records(records: Vec<ActivityRecord>) -> Self {
        Self {
            records,
            calls: Mutex::new(Vec::new()),
            fail_download: None,
            token_store_ok: true,
            accepted_password: None,
            save_fails: false,
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl GarminClient for MockClient {
    async fn login(&self, login: Login<'_>) -> Result<(), GarminError> {
        match login {
            Login::TokenStore(_) => {
                self.log("login tokens".to_string());
                if self.token_store_ok {
                    Ok(())
                } else {
                    Err(GarminError::Auth("token store rejected".to_string()))
                }
            }
            Login::Credentials(creds) => {
                self.log(format!("login credentials {}", creds.username));
                match &self.accepted_password {
                    Some(p) if p == creds.password.expose_secret() => Ok(()),
                    _ => Err(GarminError::Auth("bad credentials".to_string())),
                }
            }
        }
    }

    async fn save_session(&self, _token_store: &Path) -> Result<(), GarminError> {
        self.log("save".to_string());
        if self.save_fails {
            Err(GarminError::Io(std::io::Error::other("read-only")))
        } else {
            Ok(())
        }
    }

    async fn get_full_name(&self) -> Result<String, GarminError> {
        Ok("Test Athlete".to_string())
    }

    async fn get_activities_by_date(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        activity_type: Option<&str>,
    ) -> Result<Vec<ActivityRecord>, GarminError> {
        self.log(format!(
            "activities {start}..{end} type={}",
            activity_type.unwrap_or("any")
        ));
        Ok(self.records.clone())
    }

    async fn get_activity_evaluation(
        &self,
        activity_id: &ActivityId,
    ) -> Result<ActivityEvaluation, GarminError> {
        self.log(format!("evaluation {activity_id}"));
        self.records
            .iter()
            .find(|r| &r.activity_id == activity_id)
            .map(|r| ActivityEvaluation {
                activity_id: r.activity_id.clone(),
                activity_name: r.activity_name.clone(),
                summary: ActivitySummaryDto {
                    start_time_local: r.start_time_local.clone(),
                },
                activity_type: r.activity_type.clone(),
            })
            .ok_or_else(|| GarminError::NotFound(format!("activity {activity_id}")))
    }

    async fn download_activity(
        &self,
        activity_id: &ActivityId,
        format: DownloadFormat,
    ) -> Result<Vec<u8>, GarminError> {
        self.log(format!("download {activity_id} {}", format.tag()));
        if self.fail_download.as_ref() == Some(activity_id) {
            return Err(GarminError::Status {
                status: 500,
                body: "boom".to_string(),
            });
        }
        Ok(format!("{activity_id}.{}", format.extension()).into_bytes())
    }
}
