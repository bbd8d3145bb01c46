//! Offline client backed by a bundled activity fixture.
//!
//! Lets the whole backup run without touching Garmin Connect, for trying the
//! tool out and for tests.

use crate::{
    ActivityEvaluation, ActivityId, ActivityRecord, ActivitySummaryDto, DownloadFormat,
    GarminClient, GarminError, Login,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::Path;

const FIXTURE: &str = include_str!("../fixtures/activities.json");

#[derive(Clone, Debug)]
pub struct FakeGarminClient {
    activities: Vec<ActivityRecord>,
}

impl FakeGarminClient {
    pub fn from_fixture() -> Result<Self, GarminError> {
        Ok(Self::with_activities(serde_json::from_str(FIXTURE)?))
    }

    pub fn with_activities(activities: Vec<ActivityRecord>) -> Self {
        Self { activities }
    }

    /// Body returned for every download.
    pub fn payload(activity_id: &ActivityId) -> Vec<u8> {
        format!("Activity {activity_id}: long string of characters...").into_bytes()
    }
}

fn start_date(record: &ActivityRecord) -> Option<NaiveDate> {
    let date = record.start_time_local.get(..10)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

#[async_trait]
impl GarminClient for FakeGarminClient {
    async fn login(&self, _login: Login<'_>) -> Result<(), GarminError> {
        Ok(())
    }

    async fn save_session(&self, _token_store: &Path) -> Result<(), GarminError> {
        Ok(())
    }

    async fn get_full_name(&self) -> Result<String, GarminError> {
        Ok("Offline Athlete".to_string())
    }

    async fn get_activities_by_date(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        activity_type: Option<&str>,
    ) -> Result<Vec<ActivityRecord>, GarminError> {
        Ok(self
            .activities
            .iter()
            .filter(|a| start_date(a).is_some_and(|d| start <= d && d <= end))
            .filter(|a| match activity_type {
                Some(kind) => a.activity_type.as_ref().is_some_and(|t| t.type_key == kind),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn get_activity_evaluation(
        &self,
        activity_id: &ActivityId,
    ) -> Result<ActivityEvaluation, GarminError> {
        self.activities
            .iter()
            .find(|a| &a.activity_id == activity_id)
            .map(|a| ActivityEvaluation {
                activity_id: a.activity_id.clone(),
                activity_name: a.activity_name.clone(),
                summary: ActivitySummaryDto {
                    start_time_local: a.start_time_local.clone(),
                },
                activity_type: a.activity_type.clone(),
            })
            .ok_or_else(|| GarminError::NotFound(format!("activity {activity_id}")))
    }

    async fn download_activity(
        &self,
        activity_id: &ActivityId,
        _format: DownloadFormat,
    ) -> Result<Vec<u8>, GarminError> {
        Ok(Self::payload(activity_id))
    }
}
