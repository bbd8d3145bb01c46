use chrono::{Duration, Local};
use garmin_connect_client::{
    GarminClient, Login, config::Config, http_client::ReqwestGarminClient,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::from_env()?;
    let client = ReqwestGarminClient::from_config(&cfg)?;

    // Needs a token store written by a previous `garmin-backup` run.
    client.login(Login::TokenStore(&cfg.token_store)).await?;

    let days_back = std::env::args()
        .nth(1)
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(30);
    let end = Local::now().date_naive();
    let start = end - Duration::days(days_back);

    let activities = client.get_activities_by_date(start, end, None).await?;
    println!("{} activities since {start}", activities.len());
    for a in activities {
        println!(
            "{}\t{}\t{}",
            a.activity_id,
            a.start_time_local,
            a.activity_name.as_deref().unwrap_or("Untitled")
        );
    }
    Ok(())
}
