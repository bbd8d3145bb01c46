use chrono::NaiveDate;
use garmin_backup::dates::DateRange;
use garmin_backup::progress::Verbosity;
use garmin_backup::{BackupPlan, SelectionMode, backup};
use garmin_connect_client::fake::FakeGarminClient;
use garmin_connect_client::{ActivityId, ActivityRecord, DownloadFormat};
use std::path::Path;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn everything() -> SelectionMode {
    SelectionMode::ByDate {
        range: DateRange::new(date(1900, 1, 1), date(2026, 10, 19)).unwrap(),
        activity_type: None,
    }
}

fn plan(dest: &Path, formats: Vec<DownloadFormat>, selection: SelectionMode) -> BackupPlan {
    BackupPlan {
        destination: dest.to_path_buf(),
        formats,
        selection,
        max_activities: 100,
        verbosity: Verbosity::Tasks,
    }
}

fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn first_run_downloads_fixture_into_new_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let dest = tmp.path().join("garmin");
    let client = FakeGarminClient::from_fixture().unwrap();

    let summary = backup(&client, &plan(&dest, vec![DownloadFormat::Gpx], everything()))
        .await
        .unwrap();

    assert_eq!(summary.activities, 4);
    assert_eq!(summary.files, 4);
    assert_eq!(
        listing(&dest),
        vec![
            "2023-11-06_07.17_10000001-Villanueva_de_la_Cañada_Running.gpx",
            "2023-11-08_19.05_10000002-Untitled.gpx",
            "2024-02-10_09.38_10000003-Natación_en_piscina.gpx",
            "2024-12-17_17.52_10000004-Salida_en_bici_rápida!.gpx",
        ]
    );
    let body = std::fs::read(dest.join("2023-11-08_19.05_10000002-Untitled.gpx")).unwrap();
    assert_eq!(body, FakeGarminClient::payload(&ActivityId::from("10000002")));
}

#[tokio::test]
async fn second_run_is_a_no_op() {
    let dest = tempfile::tempdir().unwrap();
    let client = FakeGarminClient::from_fixture().unwrap();
    let p = plan(
        dest.path(),
        vec![DownloadFormat::Gpx, DownloadFormat::Original],
        everything(),
    );

    backup(&client, &p).await.unwrap();
    let before = listing(dest.path());
    let again = backup(&client, &p).await.unwrap();

    assert_eq!(again.activities, 0);
    assert_eq!(again.files, 0);
    assert_eq!(listing(dest.path()), before);
    assert_eq!(before.len(), 8);
}

#[tokio::test]
async fn any_extension_marks_activity_as_present() {
    let dest = tempfile::tempdir().unwrap();
    std::fs::write(
        dest.path()
            .join("2024-12-17_17.52_10000004-Salida_en_bici_rápida!.fit"),
        b"manual copy",
    )
    .unwrap();
    let client = FakeGarminClient::from_fixture().unwrap();

    let summary = backup(&client, &plan(dest.path(), vec![DownloadFormat::Tcx], everything()))
        .await
        .unwrap();

    assert_eq!(summary.activities, 3);
    assert!(
        !dest
            .path()
            .join("2024-12-17_17.52_10000004-Salida_en_bici_rápida!.tcx")
            .exists()
    );
}

#[tokio::test]
async fn date_and_type_filters_narrow_the_run() {
    let dest = tempfile::tempdir().unwrap();
    let client = FakeGarminClient::from_fixture().unwrap();
    let selection = SelectionMode::ByDate {
        range: DateRange::new(date(2023, 1, 1), date(2023, 12, 31)).unwrap(),
        activity_type: Some("running".to_string()),
    };

    backup(&client, &plan(dest.path(), vec![DownloadFormat::Csv], selection))
        .await
        .unwrap();

    assert_eq!(
        listing(dest.path()),
        vec!["2023-11-08_19.05_10000002-Untitled.csv"]
    );
}

#[tokio::test]
async fn explicit_ids_ignore_dates() {
    let dest = tempfile::tempdir().unwrap();
    let client = FakeGarminClient::from_fixture().unwrap();
    let selection = SelectionMode::ByIds(vec![ActivityId::from("10000003")]);

    backup(&client, &plan(dest.path(), vec![DownloadFormat::Kml], selection))
        .await
        .unwrap();

    assert_eq!(
        listing(dest.path()),
        vec!["2024-02-10_09.38_10000003-Natación_en_piscina.kml"]
    );
}

#[tokio::test]
async fn cap_limits_each_run_and_later_runs_resume() {
    let dest = tempfile::tempdir().unwrap();
    let records: Vec<ActivityRecord> = (0..150u64)
        .map(|i| {
            serde_json::from_value(serde_json::json!({
                "activityId": 20000000 + i,
                "activityName": format!("Ride {i}"),
                "startTimeLocal": "2025-03-01 08:00:00",
            }))
            .unwrap()
        })
        .collect();
    let client = FakeGarminClient::with_activities(records);
    let p = plan(dest.path(), vec![DownloadFormat::Gpx], everything());

    let first = backup(&client, &p).await.unwrap();
    assert_eq!(first.activities, 100);
    assert!(dest.path().join("2025-03-01_08.00_20000000-Ride_0.gpx").exists());
    assert!(dest.path().join("2025-03-01_08.00_20000099-Ride_99.gpx").exists());
    assert!(!dest.path().join("2025-03-01_08.00_20000100-Ride_100.gpx").exists());

    let second = backup(&client, &p).await.unwrap();
    assert_eq!(second.activities, 50);
    assert_eq!(listing(dest.path()).len(), 150);
}
