use metrics::counter;

/// Count one Garmin Connect API call by outcome.
pub fn record_api_result(endpoint: &'static str, success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!("garmin_api_total", "endpoint" => endpoint, "result" => result).increment(1);
}

pub fn record_login(method: &'static str, success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!("garmin_login_total", "method" => method, "result" => result).increment(1);
}
